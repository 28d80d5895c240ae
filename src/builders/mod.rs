//! Builders for authoring module content.
//!
//! [`TypeBuilder`] assembles a complete type definition (base type, nesting, custom
//! attributes, fields, properties, constructors and methods) and adds it to a [`Module`] in
//! one step. Method bodies are supplied as closures receiving a reference to the type being
//! built, so bodies can reference the type's own fields before the type exists.
//!
//! The builders produce exactly what a C#-style compiler would: auto-properties get a
//! `<Name>k__BackingField` field with pass-through accessors, classes without an explicit
//! constructor get a default constructor chaining to the base constructor.
//!
//! # Examples
//!
//! ```rust
//! use dotweave::builders::TypeBuilder;
//! use dotweave::metadata::corlib;
//! use dotweave::Module;
//!
//! let mut module = Module::new("Contracts");
//! let contractor = TypeBuilder::class("Contracts", "Contractor")
//!     .track_changes()
//!     .auto_property("Name", corlib::string())
//!     .build(&mut module)?;
//!
//! let def = module.type_def(contractor)?;
//! assert_eq!(def.properties.len(), 1);
//! assert_eq!(def.fields.len(), 1);
//! assert_eq!(def.methods.len(), 3);
//! # Ok::<(), dotweave::Error>(())
//! ```
//!
//! [`Module`]: crate::Module

mod property;

pub use property::PropertyBuilder;

use crate::{
    assembly::InstructionAssembler,
    metadata::{
        corlib,
        customattributes::CustomAttribute,
        field::FieldAttributes,
        method::{MethodAttributes, MethodBody, MethodRef, Param, CTOR},
        module::Module,
        token::Token,
        typesystem::{TypeAttributes, TypeRef},
    },
    runtime, Result,
};

/// Type alias for method body implementation closures
pub(crate) type BodyFn = Box<dyn FnOnce(&TypeRef, &mut InstructionAssembler)>;

const CTOR_FLAGS: MethodAttributes = MethodAttributes::PUBLIC
    .union(MethodAttributes::HIDE_BY_SIG)
    .union(MethodAttributes::SPECIAL_NAME)
    .union(MethodAttributes::RT_SPECIAL_NAME);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TypeKind {
    Class,
    Interface,
    ValueType,
    Enum,
}

struct FieldSpec {
    name: String,
    field_type: TypeRef,
    flags: FieldAttributes,
}

struct MethodSpec {
    name: String,
    flags: MethodAttributes,
    params: Vec<Param>,
    return_type: Option<TypeRef>,
    body: Option<BodyFn>,
}

/// Builder for a complete type definition.
pub struct TypeBuilder {
    kind: TypeKind,
    namespace: String,
    name: String,
    flags: TypeAttributes,
    base: Option<TypeRef>,
    nested_in: Option<Token>,
    interfaces: Vec<TypeRef>,
    attributes: Vec<CustomAttribute>,
    fields: Vec<FieldSpec>,
    properties: Vec<PropertyBuilder>,
    constructors: Vec<MethodSpec>,
    methods: Vec<MethodSpec>,
    default_constructor: bool,
}

impl TypeBuilder {
    fn new(kind: TypeKind, namespace: &str, name: &str, flags: TypeAttributes, base: Option<TypeRef>) -> Self {
        TypeBuilder {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags,
            base,
            nested_in: None,
            interfaces: Vec::new(),
            attributes: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            default_constructor: kind == TypeKind::Class,
        }
    }

    /// A public class deriving from `System.Object`
    pub fn class(namespace: &str, name: &str) -> Self {
        Self::new(
            TypeKind::Class,
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::BEFORE_FIELD_INIT,
            Some(corlib::object()),
        )
    }

    /// A public interface
    pub fn interface(namespace: &str, name: &str) -> Self {
        Self::new(
            TypeKind::Interface,
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
            None,
        )
    }

    /// A public struct deriving from `System.ValueType`
    pub fn value_type(namespace: &str, name: &str) -> Self {
        Self::new(
            TypeKind::ValueType,
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::SEALED | TypeAttributes::BEFORE_FIELD_INIT,
            Some(corlib::system("ValueType")),
        )
    }

    /// A public enumeration backed by `System.Int32`
    pub fn enumeration(namespace: &str, name: &str) -> Self {
        let mut builder = Self::new(
            TypeKind::Enum,
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            Some(corlib::system("Enum")),
        );
        builder.fields.push(FieldSpec {
            name: "value__".to_string(),
            field_type: corlib::int32(),
            flags: FieldAttributes::PUBLIC | FieldAttributes::SPECIAL_NAME,
        });
        builder
    }

    /// Set the base type
    #[must_use]
    pub fn extends(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    /// Mark the class abstract
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.flags |= TypeAttributes::ABSTRACT;
        self
    }

    /// Nest the type inside `declaring_type`
    #[must_use]
    pub fn nested_in(mut self, declaring_type: Token) -> Self {
        self.nested_in = Some(declaring_type);
        self.flags.remove(TypeAttributes::PUBLIC);
        self.flags |= TypeAttributes::NESTED_PUBLIC;
        self
    }

    /// Add an interface implementation entry
    #[must_use]
    pub fn implements(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Apply an argument-less custom attribute
    #[must_use]
    pub fn attribute(mut self, attribute_type: TypeRef) -> Self {
        self.attributes.push(CustomAttribute::new(attribute_type));
        self
    }

    /// Mark the type as a tracking root
    #[must_use]
    pub fn track_changes(self) -> Self {
        self.attribute(runtime::track_changes_attribute())
    }

    /// Mark the type as synthesized by a compiler
    #[must_use]
    pub fn compiler_generated(self) -> Self {
        self.attribute(corlib::compiler_generated())
    }

    /// Add a private instance field
    #[must_use]
    pub fn field(self, name: &str, field_type: TypeRef) -> Self {
        self.field_with(name, field_type, FieldAttributes::PRIVATE)
    }

    /// Add a field with explicit flags
    #[must_use]
    pub fn field_with(mut self, name: &str, field_type: TypeRef, flags: FieldAttributes) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            field_type,
            flags,
        });
        self
    }

    /// Add a literal of an enumeration
    #[must_use]
    pub fn enum_value(self, name: &str) -> Self {
        let own_type = TypeRef::new("", &self.namespace, &self.name);
        self.field_with(
            name,
            own_type,
            FieldAttributes::PUBLIC | FieldAttributes::STATIC,
        )
    }

    /// Add an auto-implemented property
    #[must_use]
    pub fn auto_property(self, name: &str, property_type: TypeRef) -> Self {
        self.property(PropertyBuilder::auto(name, property_type))
    }

    /// Add a property
    #[must_use]
    pub fn property(mut self, property: PropertyBuilder) -> Self {
        self.properties.push(property);
        self
    }

    /// Add an instance constructor; the body is responsible for the base or chained
    /// constructor call
    #[must_use]
    pub fn constructor(
        mut self,
        params: Vec<Param>,
        body: impl FnOnce(&TypeRef, &mut InstructionAssembler) + 'static,
    ) -> Self {
        self.constructors.push(MethodSpec {
            name: CTOR.to_string(),
            flags: CTOR_FLAGS,
            params,
            return_type: None,
            body: Some(Box::new(body)),
        });
        self
    }

    /// Add a type initializer
    #[must_use]
    pub fn static_constructor(
        self,
        body: impl FnOnce(&TypeRef, &mut InstructionAssembler) + 'static,
    ) -> Self {
        self.method(
            crate::metadata::method::CCTOR,
            MethodAttributes::PRIVATE
                | MethodAttributes::STATIC
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::RT_SPECIAL_NAME,
            Vec::new(),
            None,
            body,
        )
    }

    /// Add a method with a body
    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        flags: MethodAttributes,
        params: Vec<Param>,
        return_type: Option<TypeRef>,
        body: impl FnOnce(&TypeRef, &mut InstructionAssembler) + 'static,
    ) -> Self {
        self.methods.push(MethodSpec {
            name: name.to_string(),
            flags,
            params,
            return_type,
            body: Some(Box::new(body)),
        });
        self
    }

    /// Do not synthesize a default constructor for a class without explicit constructors
    #[must_use]
    pub fn without_default_constructor(mut self) -> Self {
        self.default_constructor = false;
        self
    }

    /// Add the type to `module` and return its token
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the declaring type of a nested type is not
    /// defined in `module` or a table of `module` is full.
    pub fn build(self, module: &mut Module) -> Result<Token> {
        let token = match self.nested_in {
            Some(outer) => module.add_nested_type(outer, &self.name, self.flags, self.base.clone())?,
            None => module.add_type(&self.namespace, &self.name, self.flags, self.base.clone())?,
        };
        let this = module.type_ref(token)?;

        if let Some(base) = &self.base {
            module.import_type(base);
        }
        for interface in &self.interfaces {
            module.import_type(interface);
        }
        for attribute in &self.attributes {
            module.import_type(&attribute.attribute_type);
        }
        {
            let def = module.type_def_mut(token)?;
            def.interfaces = self.interfaces;
            def.custom_attributes = self.attributes;
        }

        for field in self.fields {
            let field_type = if field.field_type.module.is_empty() {
                this.clone()
            } else {
                module.import_type(&field.field_type)
            };
            module.add_field(token, field.name, field_type, field.flags)?;
        }

        for property in self.properties {
            let property_type = module.import_type(&property.property_type);
            if let Some(backing) = property.backing_field {
                module.add_field(token, backing, property_type.clone(), FieldAttributes::PRIVATE)?;
            }
            let getter = match property.getter {
                Some(accessor) => Some(module.add_method(
                    token,
                    format!("get_{}", property.name),
                    accessor.flags,
                    Vec::new(),
                    Some(property_type.clone()),
                    accessor.body.map(|body| assemble(&this, body)),
                )?),
                None => None,
            };
            let setter = match property.setter {
                Some(accessor) => Some(module.add_method(
                    token,
                    format!("set_{}", property.name),
                    accessor.flags,
                    vec![Param::new("value", property_type.clone())],
                    None,
                    accessor.body.map(|body| assemble(&this, body)),
                )?),
                None => None,
            };
            module.add_property(token, property.name, property_type, getter, setter)?;
        }

        let mut constructors = self.constructors;
        if constructors.is_empty() && self.default_constructor {
            let base = self.base.clone().unwrap_or_else(corlib::object);
            constructors.push(MethodSpec {
                name: CTOR.to_string(),
                flags: CTOR_FLAGS,
                params: Vec::new(),
                return_type: None,
                body: Some(Box::new(move |_: &TypeRef, asm: &mut InstructionAssembler| {
                    asm.ldarg_0().call(MethodRef::constructor(base, Vec::new())).ret();
                })),
            });
        }
        for method in constructors.into_iter().chain(self.methods) {
            for param in &method.params {
                module.import_type(&param.param_type);
            }
            module.add_method(
                token,
                method.name,
                method.flags,
                method.params,
                method.return_type,
                method.body.map(|body| assemble(&this, body)),
            )?;
        }

        Ok(token)
    }
}

fn assemble(this: &TypeRef, body: BodyFn) -> MethodBody {
    let mut asm = InstructionAssembler::new();
    body(this, &mut asm);
    asm.finish()
}
