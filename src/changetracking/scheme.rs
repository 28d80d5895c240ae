//! Eligibility decisions.
//!
//! Pure predicates over type definitions: which types may become tracking roots and which
//! property types carry a mutable object graph worth following.

use crate::{
    changetracking::RewriteConfig,
    metadata::{
        corlib::{WellKnownType, COMPILER_GENERATED_ATTRIBUTE},
        typesystem::TypeDef,
    },
};

/// Decides which types take part in change tracking.
pub struct EligibilityScheme<'a> {
    config: &'a RewriteConfig,
}

impl<'a> EligibilityScheme<'a> {
    /// Create a scheme for `config`
    pub fn new(config: &'a RewriteConfig) -> Self {
        EligibilityScheme { config }
    }

    /// True if `def` may be a tracking root candidate.
    ///
    /// Excludes the `<Module>` pseudo-type, value types, interfaces, compiler-generated
    /// closure types and nested types unless nested types are in scope.
    pub fn needs_tracking_root(&self, def: &TypeDef) -> bool {
        if def.is_module_type() || def.is_value_type() || def.is_interface() {
            return false;
        }
        if def.is_nested() && !self.config.process_nested_types {
            return false;
        }
        !def.has_attribute(COMPILER_GENERATED_ATTRIBUTE)
    }

    /// True if a property of type `def` requires `def` itself to be woven.
    ///
    /// `full_name` is the namespace-qualified name of `def`.
    pub fn needs_tracking_for_property_type(&self, def: &TypeDef, full_name: &str) -> bool {
        if WellKnownType::from_full_name(full_name).is_some() {
            return false;
        }
        if def.is_value_type() || def.is_enum() || def.is_interface() {
            return false;
        }
        !self.config.immutable_type_names.contains(&def.name)
    }
}
