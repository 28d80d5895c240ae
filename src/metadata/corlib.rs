//! The synthesized core library.
//!
//! Every module ultimately derives from types of the core library (`System.Object`,
//! `System.ValueType`, `System.Enum`, the primitive kinds). Instead of parsing a real core
//! library image, `dotweave` synthesizes a small `mscorlib` module with the definitions the
//! weaver and the emulator need, and [`crate::metadata::resolver::ModuleResolver`] always
//! provides it.

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    metadata::{
        method::{MethodAttributes, CTOR},
        module::Module,
        typesystem::{TypeAttributes, TypeRef},
    },
    runtime, Result,
};

/// Name of the core library module
pub const CORLIB: &str = "mscorlib";

/// Namespace of the compiler-services attributes
pub const COMPILER_SERVICES: &str = "System.Runtime.CompilerServices";

/// Full name of the attribute compilers put on synthesized closure and display classes
pub const COMPILER_GENERATED_ATTRIBUTE: &str =
    "System.Runtime.CompilerServices.CompilerGeneratedAttribute";

/// A reference to `System.<name>` in the core library
pub fn system(name: &str) -> TypeRef {
    TypeRef::new(CORLIB, "System", name)
}

/// `System.Object`
pub fn object() -> TypeRef {
    system("Object")
}

/// `System.String`
pub fn string() -> TypeRef {
    system("String")
}

/// `System.Int32`
pub fn int32() -> TypeRef {
    system("Int32")
}

/// `System.Boolean`
pub fn boolean() -> TypeRef {
    system("Boolean")
}

/// `System.Guid`
pub fn guid() -> TypeRef {
    system("Guid")
}

/// `System.Nullable<T>`
pub fn nullable(inner: TypeRef) -> TypeRef {
    system("Nullable`1").instantiate(vec![inner])
}

/// `System.Runtime.CompilerServices.CompilerGeneratedAttribute`
pub fn compiler_generated() -> TypeRef {
    TypeRef::new(CORLIB, COMPILER_SERVICES, "CompilerGeneratedAttribute")
}

/// The fixed set of immutable kinds a property type never needs tracking for.
///
/// The tracker type itself is part of the set, so the tracker field of a woven type is
/// never mistaken for a trackable reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum WellKnownType {
    /// `System.Byte`
    Byte,
    /// `System.Int16`
    Int16,
    /// `System.UInt16`
    UInt16,
    /// `System.Int32`
    Int32,
    /// `System.UInt32`
    UInt32,
    /// `System.Int64`
    Int64,
    /// `System.UInt64`
    UInt64,
    /// `System.Double`
    Double,
    /// `System.Single`
    Single,
    /// `System.String`
    String,
    /// `System.Guid`
    Guid,
    /// `System.Boolean`
    Boolean,
    /// `System.DateTime`
    DateTime,
    /// The runtime change tracker
    ChangeTracker,
}

impl WellKnownType {
    /// Full name of the type
    pub fn full_name(self) -> &'static str {
        match self {
            WellKnownType::Byte => "System.Byte",
            WellKnownType::Int16 => "System.Int16",
            WellKnownType::UInt16 => "System.UInt16",
            WellKnownType::Int32 => "System.Int32",
            WellKnownType::UInt32 => "System.UInt32",
            WellKnownType::Int64 => "System.Int64",
            WellKnownType::UInt64 => "System.UInt64",
            WellKnownType::Double => "System.Double",
            WellKnownType::Single => "System.Single",
            WellKnownType::String => "System.String",
            WellKnownType::Guid => "System.Guid",
            WellKnownType::Boolean => "System.Boolean",
            WellKnownType::DateTime => "System.DateTime",
            WellKnownType::ChangeTracker => runtime::CHANGE_TRACKER,
        }
    }

    /// Look up the well-known kind with the given full name
    pub fn from_full_name(full_name: &str) -> Option<WellKnownType> {
        WellKnownType::iter().find(|kind| kind.full_name() == full_name)
    }
}

const VALUE_TYPES: &[&str] = &[
    "Byte", "SByte", "Int16", "UInt16", "Int32", "UInt32", "Int64", "UInt64", "Single", "Double",
    "Boolean", "Char", "Decimal", "Guid", "DateTime", "Nullable`1",
];

/// Build the core library module
///
/// # Errors
///
/// Only fails if the module graph under construction is inconsistent, which indicates a bug.
pub fn corlib_module() -> Result<Module> {
    let mut module = Module::new(CORLIB);
    let public = TypeAttributes::PUBLIC;
    let ctor_flags = MethodAttributes::PUBLIC
        | MethodAttributes::HIDE_BY_SIG
        | MethodAttributes::SPECIAL_NAME
        | MethodAttributes::RT_SPECIAL_NAME
        | MethodAttributes::INTERNAL_CALL;

    let object_type = module.add_type("System", "Object", public, None)?;
    module.add_method(object_type, CTOR, ctor_flags, Vec::new(), None, None)?;

    module.add_type(
        "System",
        "ValueType",
        public | TypeAttributes::ABSTRACT,
        Some(object()),
    )?;
    module.add_type(
        "System",
        "Enum",
        public | TypeAttributes::ABSTRACT,
        Some(system("ValueType")),
    )?;
    module.add_type("System", "String", public | TypeAttributes::SEALED, Some(object()))?;
    for name in VALUE_TYPES {
        module.add_type(
            "System",
            *name,
            public | TypeAttributes::SEALED,
            Some(system("ValueType")),
        )?;
    }

    let attribute = module.add_type(
        "System",
        "Attribute",
        public | TypeAttributes::ABSTRACT,
        Some(object()),
    )?;
    module.add_method(attribute, CTOR, ctor_flags, Vec::new(), None, None)?;

    let compiler_generated = module.add_type(
        COMPILER_SERVICES,
        "CompilerGeneratedAttribute",
        public | TypeAttributes::SEALED,
        Some(system("Attribute")),
    )?;
    module.add_method(compiler_generated, CTOR, ctor_flags, Vec::new(), None, None)?;

    Ok(module)
}

/// Number of well-known immutable kinds
pub const WELL_KNOWN_COUNT: usize = WellKnownType::COUNT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_lookup() {
        assert_eq!(
            WellKnownType::from_full_name("System.String"),
            Some(WellKnownType::String)
        );
        assert_eq!(
            WellKnownType::from_full_name(runtime::CHANGE_TRACKER),
            Some(WellKnownType::ChangeTracker)
        );
        assert_eq!(WellKnownType::from_full_name("System.Decimal"), None);
        assert_eq!(WellKnownType::iter().count(), WELL_KNOWN_COUNT);
    }

    #[test]
    fn test_corlib_shapes() -> Result<()> {
        let module = corlib_module()?;
        let enum_type = module.find_type("System.Enum").map(|t| module.type_def(t));
        assert!(matches!(enum_type, Some(Ok(def)) if !def.is_value_type()));

        for kind in WellKnownType::iter().filter(|k| *k != WellKnownType::ChangeTracker) {
            let token = module.find_type(kind.full_name());
            assert!(token.is_some(), "{} missing", kind.full_name());
        }

        let int32 = module
            .find_type("System.Int32")
            .map(|t| module.type_def(t).map(|def| def.is_value_type()));
        assert!(matches!(int32, Some(Ok(true))));
        assert!(module.find_type(COMPILER_GENERATED_ATTRIBUTE).is_some());
        Ok(())
    }
}
