//! Property definitions.

use serde::{Deserialize, Serialize};

use crate::metadata::{token::Token, typesystem::TypeRef};

/// A property definition row, tying a getter and a setter method together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Token of this definition within its module
    pub token: Token,
    /// Property name
    pub name: String,
    /// Declared type of the property
    pub property_type: TypeRef,
    /// The `get_` accessor, if any
    pub getter: Option<Token>,
    /// The `set_` accessor, if any
    pub setter: Option<Token>,
    /// The type declaring this property
    pub declaring_type: Token,
}
