//! Field definitions and field references.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::metadata::{token::Token, typesystem::TypeRef};

const FIELD_ACCESS_MASK: u16 = 0x0007;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
    /// All possible flags for `FieldAttributes`
    pub struct FieldAttributes : u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized, not written to after init
        const INIT_ONLY = 0x0020;
        /// Field is emitted by a compiler or a tool
        const SPECIAL_NAME = 0x0200;
    }
}

/// A field definition row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDef {
    /// Token of this definition within its module
    pub token: Token,
    /// Field name
    pub name: String,
    /// Declared type of the field
    pub field_type: TypeRef,
    /// Flags
    pub flags: FieldAttributes,
    /// The type declaring this field
    pub declaring_type: Token,
}

impl FieldDef {
    /// Field is per-type rather than per-instance
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }

    /// Field is private to its declaring type
    pub fn is_private(&self) -> bool {
        self.flags.bits() & FIELD_ACCESS_MASK == FieldAttributes::PRIVATE.bits()
    }
}

/// Reference to a field, possibly declared in another module.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// The type declaring the field
    pub declaring: TypeRef,
    /// Field name
    pub name: String,
    /// Declared type of the field
    pub field_type: TypeRef,
}

impl FieldRef {
    /// Reference to the field `name` of `declaring`
    pub fn new(declaring: TypeRef, name: impl Into<String>, field_type: TypeRef) -> Self {
        FieldRef {
            declaring,
            name: name.into(),
            field_type,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring, self.name)
    }
}
