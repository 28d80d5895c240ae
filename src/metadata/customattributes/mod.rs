//! Custom attributes applied to type definitions.
//!
//! The weaver only cares about the presence of marker attributes, so an attribute is
//! represented by its type reference plus an optional list of positional string arguments
//! kept verbatim for round-tripping.

use serde::{Deserialize, Serialize};

use crate::metadata::typesystem::TypeRef;

/// One custom attribute instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttribute {
    /// The attribute class
    pub attribute_type: TypeRef,
    /// Positional constructor arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

impl CustomAttribute {
    /// An argument-less attribute of type `attribute_type`
    pub fn new(attribute_type: TypeRef) -> Self {
        CustomAttribute {
            attribute_type,
            arguments: Vec::new(),
        }
    }
}
