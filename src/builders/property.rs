use crate::{
    assembly::InstructionAssembler,
    builders::BodyFn,
    metadata::{field::FieldRef, method::MethodAttributes, typesystem::TypeRef},
};

pub(crate) const ACCESSOR_FLAGS: MethodAttributes = MethodAttributes::PUBLIC
    .union(MethodAttributes::HIDE_BY_SIG)
    .union(MethodAttributes::SPECIAL_NAME);

pub(crate) struct AccessorSpec {
    pub(crate) flags: MethodAttributes,
    pub(crate) body: Option<BodyFn>,
}

/// Builder for a property and its accessors.
///
/// # Examples
///
/// ```rust
/// use dotweave::builders::{PropertyBuilder, TypeBuilder};
/// use dotweave::metadata::{corlib, field::FieldRef};
/// use dotweave::Module;
///
/// let mut module = Module::new("Contracts");
/// let document = TypeBuilder::class("Contracts", "Document")
///     .field("number", corlib::string())
///     .field("trash", corlib::string())
///     .property(
///         PropertyBuilder::new("Number", corlib::string())
///             .getter(|this, asm| {
///                 asm.ldarg_0()
///                     .ldfld(FieldRef::new(this.clone(), "number", corlib::string()))
///                     .ret();
///             })
///             .setter(|this, asm| {
///                 asm.ldarg_0()
///                     .ldarg_1()
///                     .stfld(FieldRef::new(this.clone(), "number", corlib::string()))
///                     .ldarg_0()
///                     .ldarg_1()
///                     .stfld(FieldRef::new(this.clone(), "trash", corlib::string()))
///                     .ret();
///             }),
///     )
///     .build(&mut module)?;
/// assert!(module.find_property(document, "Number").is_some());
/// # Ok::<(), dotweave::Error>(())
/// ```
pub struct PropertyBuilder {
    pub(crate) name: String,
    pub(crate) property_type: TypeRef,
    pub(crate) backing_field: Option<String>,
    pub(crate) getter: Option<AccessorSpec>,
    pub(crate) setter: Option<AccessorSpec>,
}

impl PropertyBuilder {
    /// A property without accessors
    pub fn new(name: impl Into<String>, property_type: TypeRef) -> Self {
        PropertyBuilder {
            name: name.into(),
            property_type,
            backing_field: None,
            getter: None,
            setter: None,
        }
    }

    /// An auto-implemented property: a compiler-named backing field with pass-through
    /// public accessors
    pub fn auto(name: impl Into<String>, property_type: TypeRef) -> Self {
        let name = name.into();
        let backing = format!("<{name}>k__BackingField");

        let (field_name, field_type) = (backing.clone(), property_type.clone());
        let getter = move |this: &TypeRef, asm: &mut InstructionAssembler| {
            asm.ldarg_0()
                .ldfld(FieldRef::new(this.clone(), field_name, field_type))
                .ret();
        };
        let (field_name, field_type) = (backing.clone(), property_type.clone());
        let setter = move |this: &TypeRef, asm: &mut InstructionAssembler| {
            asm.ldarg_0()
                .ldarg_1()
                .stfld(FieldRef::new(this.clone(), field_name, field_type))
                .ret();
        };

        let mut builder = PropertyBuilder::new(name, property_type)
            .getter(getter)
            .setter(setter);
        builder.backing_field = Some(backing);
        builder
    }

    /// Public getter with the given body
    #[must_use]
    pub fn getter(mut self, body: impl FnOnce(&TypeRef, &mut InstructionAssembler) + 'static) -> Self {
        self.getter = Some(AccessorSpec {
            flags: ACCESSOR_FLAGS,
            body: Some(Box::new(body)),
        });
        self
    }

    /// Public setter with the given body
    #[must_use]
    pub fn setter(mut self, body: impl FnOnce(&TypeRef, &mut InstructionAssembler) + 'static) -> Self {
        self.setter = Some(AccessorSpec {
            flags: ACCESSOR_FLAGS,
            body: Some(Box::new(body)),
        });
        self
    }

    /// Abstract getter, as declared on interfaces
    #[must_use]
    pub fn abstract_getter(mut self) -> Self {
        self.getter = Some(AccessorSpec {
            flags: ACCESSOR_FLAGS | MethodAttributes::VIRTUAL | MethodAttributes::ABSTRACT,
            body: None,
        });
        self
    }

    /// Abstract setter, as declared on interfaces
    #[must_use]
    pub fn abstract_setter(mut self) -> Self {
        self.setter = Some(AccessorSpec {
            flags: ACCESSOR_FLAGS | MethodAttributes::VIRTUAL | MethodAttributes::ABSTRACT,
            body: None,
        });
        self
    }

    /// Make the getter private
    #[must_use]
    pub fn private_getter(mut self) -> Self {
        if let Some(getter) = &mut self.getter {
            getter.flags = private(getter.flags);
        }
        self
    }

    /// Make the setter private
    #[must_use]
    pub fn private_setter(mut self) -> Self {
        if let Some(setter) = &mut self.setter {
            setter.flags = private(setter.flags);
        }
        self
    }
}

fn private(flags: MethodAttributes) -> MethodAttributes {
    flags.difference(MethodAttributes::PUBLIC) | MethodAttributes::PRIVATE
}
