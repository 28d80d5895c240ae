//! Type references and type definitions of a module.
//!
//! A [`TypeRef`] names a type by its declaring module plus namespace and name, so the same
//! logical type referenced from different modules compares equal by [`TypeRef::full_name`]
//! regardless of which reference object carried it. A [`TypeDef`] is the definition row
//! stored in a module arena; its members are referenced through [`Token`]s.
//!
//! # Key Components
//!
//! - [`TypeRef`]: Assembly-qualified reference to a type, optionally decorated as array or
//!   generic instance
//! - [`TypeDef`]: Type definition with base type, nesting, members and custom attributes
//! - [`TypeAttributes`]: ECMA-335 style type flags (visibility, interface, abstract, sealed)
//!
//! # Examples
//!
//! ```rust
//! use dotweave::metadata::typesystem::TypeRef;
//!
//! let contractor = TypeRef::new("Contracts", "Contracts.Model", "Contractor");
//! assert_eq!(contractor.full_name(), "Contracts.Model.Contractor");
//! assert_eq!(contractor.to_string(), "[Contracts]Contracts.Model.Contractor");
//! ```

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::metadata::{customattributes::CustomAttribute, token::Token};

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
    /// All possible flags for `TypeAttributes`
    pub struct TypeAttributes : u32 {
        /// Class is public scope
        const PUBLIC = 0x0000_0001;
        /// Class is nested with public visibility
        const NESTED_PUBLIC = 0x0000_0002;
        /// Class is nested with private visibility
        const NESTED_PRIVATE = 0x0000_0003;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Class is abstract
        const ABSTRACT = 0x0000_0080;
        /// Class cannot be extended
        const SEALED = 0x0000_0100;
        /// Class name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Initialize the class before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

/// Full name of the universal base type
pub const OBJECT_TYPE: &str = "System.Object";
/// Full name of the base of all value types
pub const VALUE_TYPE: &str = "System.ValueType";
/// Full name of the base of all enumerations
pub const ENUM_TYPE: &str = "System.Enum";
/// Name of the synthetic type holding module-level globals
pub const MODULE_TYPE_NAME: &str = "<Module>";

/// Reference to a type in a specific module.
///
/// The array and generic decorations are carried along for signatures but are ignored by
/// resolution: an array resolves to its element type and a generic instance to its generic
/// definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Name of the module declaring the type
    pub module: String,
    /// Namespace of the type (of the outermost type for nested types)
    pub namespace: String,
    /// Name of the type; nested types use `Outer/Inner`
    pub name: String,
    /// Generic arguments of a generic instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_args: Vec<TypeRef>,
    /// Single-dimensional array of this type
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_array: bool,
}

impl TypeRef {
    /// Create a plain reference to `namespace.name` in `module`
    pub fn new(
        module: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        TypeRef {
            module: module.into(),
            namespace: namespace.into(),
            name: name.into(),
            generic_args: Vec::new(),
            is_array: false,
        }
    }

    /// Returns an array of this type
    #[must_use]
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Returns a generic instance of this type with the given arguments
    #[must_use]
    pub fn instantiate(mut self, args: Vec<TypeRef>) -> Self {
        self.generic_args = args;
        self
    }

    /// Returns the full name (Namespace.Name) of the referenced definition
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{0}.{1}", self.namespace, self.name)
        }
    }

    /// True if the reference names the definition `full_name`, ignoring decorations
    pub fn is(&self, full_name: &str) -> bool {
        let ns_len = self.namespace.len();
        if ns_len == 0 {
            return self.name == full_name;
        }
        full_name.len() == ns_len + 1 + self.name.len()
            && full_name.starts_with(self.namespace.as_str())
            && full_name.as_bytes()[ns_len] == b'.'
            && full_name.ends_with(self.name.as_str())
    }

    /// The simple name of the type (innermost name for nested types)
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// The same reference without array or generic decoration
    #[must_use]
    pub fn definition(&self) -> TypeRef {
        TypeRef::new(&self.module, &self.namespace, &self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.module, self.full_name())?;
        if !self.generic_args.is_empty() {
            let args: Vec<String> = self.generic_args.iter().map(ToString::to_string).collect();
            write!(f, "<{}>", args.join(","))?;
        }
        if self.is_array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// A type definition row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeDef {
    /// Token of this definition within its module
    pub token: Token,
    /// `TypeNamespace` (empty for nested types and the synthetic `<Module>` type)
    pub namespace: String,
    /// `TypeName`
    pub name: String,
    /// Flags
    pub flags: TypeAttributes,
    /// This types base aka 'extends', `None` for interfaces and `System.Object`
    pub base: Option<TypeRef>,
    /// The enclosing type for nested types
    pub declaring_type: Option<Token>,
    /// All interfaces this type implements
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    /// All fields this type declares
    #[serde(default)]
    pub fields: Vec<Token>,
    /// All methods this type declares
    #[serde(default)]
    pub methods: Vec<Token>,
    /// All properties this type declares
    #[serde(default)]
    pub properties: Vec<Token>,
    /// All custom attributes applied to this type
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
}

impl TypeDef {
    /// Create an empty definition
    pub fn new(
        token: Token,
        namespace: impl Into<String>,
        name: impl Into<String>,
        flags: TypeAttributes,
        base: Option<TypeRef>,
    ) -> Self {
        TypeDef {
            token,
            namespace: namespace.into(),
            name: name.into(),
            flags,
            base,
            declaring_type: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            custom_attributes: Vec::new(),
        }
    }

    /// Type is an interface
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeAttributes::INTERFACE)
    }

    /// Type is an enumeration (extends `System.Enum`)
    pub fn is_enum(&self) -> bool {
        self.base.as_ref().is_some_and(|base| base.is(ENUM_TYPE))
    }

    /// Type is a value type (extends `System.ValueType` or `System.Enum`)
    ///
    /// `System.Enum` itself extends `System.ValueType` but is a reference type, same as in
    /// the runtime.
    pub fn is_value_type(&self) -> bool {
        match &self.base {
            Some(base) => {
                (base.is(VALUE_TYPE) || base.is(ENUM_TYPE)) && self.plain_name() != ENUM_TYPE
            }
            None => false,
        }
    }

    /// Type is nested in another type
    pub fn is_nested(&self) -> bool {
        self.declaring_type.is_some()
    }

    /// Type is the synthetic module-globals type
    pub fn is_module_type(&self) -> bool {
        self.name == MODULE_TYPE_NAME
    }

    /// True if a custom attribute of type `attribute_full_name` is applied directly to this type
    pub fn has_attribute(&self, attribute_full_name: &str) -> bool {
        self.custom_attributes
            .iter()
            .any(|attribute| attribute.attribute_type.is(attribute_full_name))
    }

    /// True if this type lists `interface_full_name` among its own interfaces
    pub fn implements(&self, interface_full_name: &str) -> bool {
        self.interfaces.iter().any(|i| i.is(interface_full_name))
    }

    fn plain_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(base: Option<TypeRef>) -> TypeDef {
        TypeDef::new(Token::type_def(1), "Ns", "T", TypeAttributes::PUBLIC, base)
    }

    #[test]
    fn test_full_name_and_is() {
        let nested = TypeRef::new("M", "Ns", "Outer/Inner");
        assert_eq!(nested.full_name(), "Ns.Outer/Inner");
        assert!(nested.is("Ns.Outer/Inner"));
        assert!(!nested.is("Ns.Outer"));
        assert_eq!(nested.simple_name(), "Inner");

        let global = TypeRef::new("M", "", "<Module>");
        assert_eq!(global.full_name(), "<Module>");
        assert!(global.is("<Module>"));
    }

    #[test]
    fn test_decorations_ignored_by_identity() {
        let plain = TypeRef::new("mscorlib", "System", "String");
        let array = plain.clone().array();
        assert!(array.is("System.String"));
        assert_eq!(array.definition(), plain);
        assert_eq!(array.to_string(), "[mscorlib]System.String[]");
    }

    #[test]
    fn test_value_type_classification() {
        let value_type = def(Some(TypeRef::new("mscorlib", "System", "ValueType")));
        assert!(value_type.is_value_type());
        assert!(!value_type.is_enum());

        let enumeration = def(Some(TypeRef::new("mscorlib", "System", "Enum")));
        assert!(enumeration.is_value_type());
        assert!(enumeration.is_enum());

        let class = def(Some(TypeRef::new("mscorlib", "System", "Object")));
        assert!(!class.is_value_type());

        let mut system_enum = TypeDef::new(
            Token::type_def(2),
            "System",
            "Enum",
            TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT,
            Some(TypeRef::new("mscorlib", "System", "ValueType")),
        );
        assert!(!system_enum.is_value_type());
        system_enum.flags |= TypeAttributes::INTERFACE;
        assert!(system_enum.is_interface());
    }
}
