//! Injection of change tracking into one type definition.
//!
//! [`TypeWeaver`] edits a single type of the module being rewritten:
//!
//! - [`TypeWeaver::install_tracker`] adds the tracker field, initializes it in every
//!   constructor and implements `ITrackable` on the type
//! - [`TypeWeaver::try_instrument_property`] rewrites the setter of a simple pass-through
//!   property so that it reports the change before storing the new value
//! - [`TypeWeaver::mark_processed`] records that the type has been woven
//!
//! An instrumented setter reads as follows, the original store following unchanged:
//!
//! ```text
//! ldarg.0
//! ldfld    ChangeTracker Owner::__changeTracker
//! ldarg.0
//! ldfld    T Owner::<Name>k__BackingField
//! ldarg.1
//! call     ChangeTracker::BeforeTargetPropertyChange(object, object)
//! ldarg.0
//! ldarg.1
//! stfld    T Owner::<Name>k__BackingField
//! ret
//! ```

use crate::{
    assembly::{Instruction, InstructionAssembler},
    metadata::{
        customattributes::CustomAttribute,
        field::{FieldAttributes, FieldRef},
        method::{MethodAttributes, MethodDef},
        module::Module,
        token::Token,
        typesystem::TypeDef,
    },
    runtime, Result,
};

/// Name of the field holding the tracker of an instance
pub const TRACKER_FIELD: &str = "__changeTracker";

/// The tracker field of a type, and whether [`TypeWeaver::install_tracker`] created it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerField {
    /// Reference to the field
    pub field: FieldRef,
    /// The field was added by this call
    pub installed: bool,
}

/// Binary-level editor for the types of one module.
pub struct TypeWeaver<'a> {
    module: &'a mut Module,
}

impl<'a> TypeWeaver<'a> {
    /// Create a weaver editing `module`
    pub fn new(module: &'a mut Module) -> Self {
        TypeWeaver { module }
    }

    /// Ensure `type_token` carries a tracker field and return a reference to it.
    ///
    /// A type already carrying the field named [`TRACKER_FIELD`] is left as it is; other
    /// fields of tracker type belong to the user and are never taken for the tracker.
    /// Otherwise a private field is added, every constructor that does not chain to another
    /// constructor of the same type initializes it right after the base constructor call, and
    /// the type implements `ITrackable` through a `Tracker` property returning the field.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `type_token` is not a type of this module.
    pub fn install_tracker(&mut self, type_token: Token) -> Result<TrackerField> {
        let module: &Module = self.module;
        if let Some(existing) = installed_tracker(module, module.type_def(type_token)?) {
            return Ok(TrackerField {
                field: self.module.field_ref(existing)?,
                installed: false,
            });
        }

        let owner = self.module.type_ref(type_token)?;
        let tracker_type = self.module.import_type(&runtime::change_tracker());
        let field = self.module.add_field(
            type_token,
            TRACKER_FIELD,
            tracker_type.clone(),
            FieldAttributes::PRIVATE,
        )?;
        let field = self.module.field_ref(field)?;

        let constructor = self.module.import_method(&runtime::tracker_constructor());
        let initializer = vec![
            Instruction::LdArg(0),
            Instruction::LdArg(0),
            Instruction::NewObj(constructor),
            Instruction::StFld(field.clone()),
        ];
        for method in self.module.type_def(type_token)?.methods.clone() {
            let method = self.module.method_mut(method)?;
            if !method.is_constructor() {
                continue;
            }
            let Some(body) = method.body.as_mut() else {
                continue;
            };
            let position = match body.constructor_call() {
                Some((_, callee)) if callee.declaring.is(&owner.full_name()) => continue,
                Some((index, _)) => index + 1,
                None => 0,
            };
            body.insert(position, initializer.clone());
        }

        self.implement_trackable(type_token, &field)?;
        log::debug!("installed tracker field on {}", owner);
        Ok(TrackerField {
            field,
            installed: true,
        })
    }

    fn implement_trackable(&mut self, type_token: Token, field: &FieldRef) -> Result<()> {
        let interface = self.module.import_type(&runtime::trackable());
        let tracker_type = field.field_type.clone();

        let body = InstructionAssembler::new()
            .ldarg_0()
            .ldfld(field.clone())
            .ret()
            .finish();
        let getter = self.module.add_method(
            type_token,
            runtime::GET_TRACKER,
            MethodAttributes::PUBLIC
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::VIRTUAL
                | MethodAttributes::FINAL
                | MethodAttributes::NEW_SLOT,
            Vec::new(),
            Some(tracker_type.clone()),
            Some(body),
        )?;
        self.module.add_property(
            type_token,
            runtime::TRACKER_PROPERTY,
            tracker_type,
            Some(getter),
            None,
        )?;

        let def = self.module.type_def_mut(type_token)?;
        if !def.implements(runtime::TRACKABLE) {
            def.interfaces.push(interface);
        }
        Ok(())
    }

    /// Instrument the setter of `property` to report changes through `tracker`.
    ///
    /// Returns `false` without touching anything unless the property is a simple
    /// pass-through pair: a non-private getter doing nothing but return one private
    /// instance field of the declaring type, and a non-private setter doing nothing but store
    /// its argument to that same field, with no other method than a constructor reading or
    /// writing the field.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `property` or its accessors are not defined in
    /// this module.
    pub fn try_instrument_property(&mut self, property: Token, tracker: &FieldRef) -> Result<bool> {
        let Some((setter, backing)) = self.simple_accessors(property)? else {
            return Ok(false);
        };

        let tracker = self.module.import_field(tracker);
        let notify = self
            .module
            .import_method(&runtime::before_target_property_change());
        let prologue = vec![
            Instruction::LdArg(0),
            Instruction::LdFld(tracker),
            Instruction::LdArg(0),
            Instruction::LdFld(backing),
            Instruction::LdArg(1),
            Instruction::Call(notify),
        ];

        let method = self.module.method_mut(setter)?;
        match method.body.as_mut() {
            Some(body) => body.insert(0, prologue),
            None => return Ok(false),
        }
        log::debug!(
            "instrumented property {} of {}",
            self.module.property(property)?.name,
            self.module.type_full_name(self.module.property(property)?.declaring_type)?
        );
        Ok(true)
    }

    /// The setter and backing field of a simple pass-through property
    fn simple_accessors(&self, property: Token) -> Result<Option<(Token, FieldRef)>> {
        let def = self.module.property(property)?;
        let (Some(getter), Some(setter)) = (def.getter, def.setter) else {
            return Ok(None);
        };
        let getter_def = self.module.method(getter)?;
        let setter_def = self.module.method(setter)?;
        if !is_plain_accessor(getter_def) || !is_plain_accessor(setter_def) {
            return Ok(None);
        }

        let Some(read) = getter_def.body.as_ref().and_then(|body| {
            match body.significant().collect::<Vec<_>>().as_slice() {
                [Instruction::LdArg(0), Instruction::LdFld(field), Instruction::Ret] => Some(field.clone()),
                _ => None,
            }
        }) else {
            return Ok(None);
        };
        let Some(written) = setter_def.body.as_ref().and_then(|body| {
            match body.significant().collect::<Vec<_>>().as_slice() {
                [Instruction::LdArg(0), Instruction::LdArg(1), Instruction::StFld(field), Instruction::Ret] => {
                    Some(field.clone())
                }
                _ => None,
            }
        }) else {
            return Ok(None);
        };
        if read != written {
            return Ok(None);
        }

        let owner = self.module.type_def(def.declaring_type)?;
        if !read.declaring.is(&self.module.type_full_name(def.declaring_type)?) {
            return Ok(None);
        }
        let Some(backing) = self.module.find_field(def.declaring_type, &read.name) else {
            return Ok(None);
        };
        let backing_def = self.module.field(backing)?;
        if backing_def.is_static() || !backing_def.is_private() {
            return Ok(None);
        }

        for &method in &owner.methods {
            if method == getter || method == setter {
                continue;
            }
            let other = self.module.method(method)?;
            if other.is_constructor() {
                continue;
            }
            if other
                .body
                .as_ref()
                .is_some_and(|body| body.loads_field(&read) || body.stores_field(&read))
            {
                return Ok(None);
            }
        }
        Ok(Some((setter, read)))
    }

    /// Record that `type_token` has been woven
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `type_token` is not a type of this module.
    pub fn mark_processed(&mut self, type_token: Token) -> Result<()> {
        let marker = self.module.import_type(&runtime::rewritten_attribute());
        let def = self.module.type_def_mut(type_token)?;
        if !def.has_attribute(runtime::REWRITTEN_ATTRIBUTE) {
            def.custom_attributes.push(CustomAttribute::new(marker));
        }
        Ok(())
    }
}

fn is_tracker(module: &Module, field: Token) -> bool {
    module
        .field(field)
        .is_ok_and(|f| !f.is_static() && f.field_type.is(runtime::CHANGE_TRACKER))
}

/// The field [`TypeWeaver::install_tracker`] added to `def`, if any
fn installed_tracker(module: &Module, def: &TypeDef) -> Option<Token> {
    def.fields.iter().copied().find(|&field| {
        is_tracker(module, field) && module.field(field).is_ok_and(|f| f.name == TRACKER_FIELD)
    })
}

/// The tracker field of an already woven type: the field installed by the weaver, or else the
/// only instance field of tracker type.
///
/// Only meaningful for types carrying the processed marker. On a type that has not been
/// woven yet, a field of tracker type belongs to the user and is not the tracker.
pub fn tracker_field(module: &Module, def: &TypeDef) -> Option<Token> {
    if let Some(field) = installed_tracker(module, def) {
        return Some(field);
    }
    if !def.has_attribute(runtime::REWRITTEN_ATTRIBUTE) {
        return None;
    }
    let mut candidates = def.fields.iter().copied().filter(|&field| is_tracker(module, field));
    let first = candidates.next()?;
    candidates.next().is_none().then_some(first)
}

fn is_plain_accessor(method: &MethodDef) -> bool {
    !method.is_static() && !method.is_private() && method.body.is_some()
}
