//! Method definitions, method references and method bodies.
//!
//! Methods without a [`MethodBody`] are either abstract or implemented by the runtime
//! (`INTERNAL_CALL`), which is how the runtime support module exposes the tracker.

mod body;

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub use body::MethodBody;

use crate::metadata::{token::Token, typesystem::TypeRef};

/// Name of instance constructors
pub const CTOR: &str = ".ctor";
/// Name of type initializers
pub const CCTOR: &str = ".cctor";

const MEMBER_ACCESS_MASK: u16 = 0x0007;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
    /// All possible flags for `MethodAttributes`
    pub struct MethodAttributes : u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method may not be overridden
        const FINAL = 0x0020;
        /// Method can be overridden
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special (accessors, constructors)
        const SPECIAL_NAME = 0x0800;
        /// Runtime should check name encoding
        const RT_SPECIAL_NAME = 0x1000;
        /// Implementation is provided by the runtime
        const INTERNAL_CALL = 0x4000;
    }
}

/// A method parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared parameter type
    pub param_type: TypeRef,
}

impl Param {
    /// A parameter named `name` of type `param_type`
    pub fn new(name: impl Into<String>, param_type: TypeRef) -> Self {
        Param {
            name: name.into(),
            param_type,
        }
    }
}

/// A method definition row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodDef {
    /// Token of this definition within its module
    pub token: Token,
    /// Method name
    pub name: String,
    /// Flags
    pub flags: MethodAttributes,
    /// Parameters, excluding `this`
    #[serde(default)]
    pub params: Vec<Param>,
    /// Return type, `None` for `void`
    pub return_type: Option<TypeRef>,
    /// The type declaring this method
    pub declaring_type: Token,
    /// IL body, `None` for abstract and runtime-implemented methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    /// Method is an instance constructor
    pub fn is_constructor(&self) -> bool {
        self.name == CTOR && !self.is_static()
    }

    /// Method is static
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC)
    }

    /// Method is private to its declaring type
    pub fn is_private(&self) -> bool {
        self.flags.bits() & MEMBER_ACCESS_MASK == MethodAttributes::PRIVATE.bits()
    }

    /// Implementation is supplied by the runtime
    pub fn is_internal_call(&self) -> bool {
        self.flags.contains(MethodAttributes::INTERNAL_CALL)
    }
}

/// Reference to a method, possibly declared in another module.
///
/// Methods are matched by declaring type, name and parameter count; the
/// instruction set carries no overloads that differ only in parameter types.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    /// The type declaring the method
    pub declaring: TypeRef,
    /// Method name
    pub name: String,
    /// Parameter types, excluding `this`
    #[serde(default)]
    pub params: Vec<TypeRef>,
    /// Instance method
    pub has_this: bool,
    /// Return type, `None` for `void`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeRef>,
}

impl MethodRef {
    /// Reference to an instance method
    pub fn instance(declaring: TypeRef, name: impl Into<String>, params: Vec<TypeRef>) -> Self {
        MethodRef {
            declaring,
            name: name.into(),
            params,
            has_this: true,
            return_type: None,
        }
    }

    /// The same reference with a non-void return type
    #[must_use]
    pub fn returning(mut self, return_type: TypeRef) -> Self {
        self.return_type = Some(return_type);
        self
    }

    /// Reference to an instance constructor
    pub fn constructor(declaring: TypeRef, params: Vec<TypeRef>) -> Self {
        Self::instance(declaring, CTOR, params)
    }

    /// Reference names an instance constructor
    pub fn is_constructor(&self) -> bool {
        self.has_this && self.name == CTOR
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(TypeRef::full_name).collect();
        write!(f, "{}::{}({})", self.declaring, self.name, params.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(flags: MethodAttributes) -> MethodDef {
        MethodDef {
            token: Token::method_def(1),
            name: "get_Name".into(),
            flags,
            params: Vec::new(),
            return_type: None,
            declaring_type: Token::type_def(1),
            body: None,
        }
    }

    #[test]
    fn test_visibility() {
        assert!(method(MethodAttributes::PRIVATE).is_private());
        assert!(!method(MethodAttributes::PUBLIC).is_private());
        assert!(!method(MethodAttributes::PUBLIC | MethodAttributes::SPECIAL_NAME).is_private());
    }

    #[test]
    fn test_constructor_classification() {
        let mut ctor = method(MethodAttributes::PUBLIC | MethodAttributes::RT_SPECIAL_NAME);
        ctor.name = CTOR.into();
        assert!(ctor.is_constructor());

        ctor.flags |= MethodAttributes::STATIC;
        assert!(!ctor.is_constructor());
    }

    #[test]
    fn test_method_ref_display() {
        let reference = MethodRef::constructor(
            TypeRef::new("Dotweave.Runtime", "Dotweave.Runtime", "ChangeTracker"),
            vec![TypeRef::new("mscorlib", "System", "Object")],
        );
        assert!(reference.is_constructor());
        assert_eq!(
            reference.to_string(),
            "[Dotweave.Runtime]Dotweave.Runtime.ChangeTracker::.ctor(System.Object)"
        );
    }
}
