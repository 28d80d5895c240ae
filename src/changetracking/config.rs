//! Configuration of a change-tracking rewrite.
//!
//! A [`RewriteConfig`] is immutable input to one run of the rewriter: which types are
//! candidates, whether nested types are in scope, which type names are immutable and two
//! callbacks deciding where the rewrite scope ends.

use std::{collections::HashSet, fmt, sync::Arc};

use crate::metadata::typesystem::TypeRef;

/// Predicate identifying base types outside the rewrite scope
pub type ForeignPredicate = Arc<dyn Fn(&TypeRef) -> bool + Send + Sync>;

/// Callback naming the module a resolved type belongs to
pub type ModuleOf = Arc<dyn Fn(&TypeRef) -> String + Send + Sync>;

/// What to do when the walk reaches a type that is still being processed.
///
/// Property graphs may reference back to a type whose weaving is in progress, for example
/// a `Node` with a `Next` property of type `Node`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Fail the run with [`crate::Error::CyclicReference`]
    #[default]
    Fail,
    /// Treat the type as satisfied; its tracker field is already known at that point
    Accept,
}

/// Configuration for [`ChangeTrackingRewriter`](super::ChangeTrackingRewriter).
#[derive(Clone)]
pub struct RewriteConfig {
    /// Full names of the candidate types; `None` considers every type of the module.
    pub types_to_process: Option<Vec<String>>,

    /// Consider nested types as tracking roots (default: false).
    pub process_nested_types: bool,

    /// Simple names of types never instrumented nor recursed into.
    pub immutable_type_names: HashSet<String>,

    /// Base types for which this predicate holds are treated as out of scope.
    pub is_foreign: Option<ForeignPredicate>,

    /// Overrides the module a referenced type is considered to belong to.
    ///
    /// Defaults to the module declaring the type.
    pub module_of: Option<ModuleOf>,

    /// Behaviour on cyclic property graphs (default: [`CyclePolicy::Fail`]).
    pub cycle_policy: CyclePolicy,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        RewriteConfig {
            types_to_process: None,
            process_nested_types: false,
            immutable_type_names: HashSet::new(),
            is_foreign: None,
            module_of: None,
            cycle_policy: CyclePolicy::Fail,
        }
    }
}

impl RewriteConfig {
    /// Restrict the candidates to the given full type names
    #[must_use]
    pub fn with_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types_to_process = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Include or exclude nested types
    #[must_use]
    pub fn with_nested_types(mut self, enabled: bool) -> Self {
        self.process_nested_types = enabled;
        self
    }

    /// Add a simple type name to the immutable set
    #[must_use]
    pub fn with_immutable_type(mut self, name: impl Into<String>) -> Self {
        self.immutable_type_names.insert(name.into());
        self
    }

    /// Set the foreign-type predicate
    #[must_use]
    pub fn with_foreign(mut self, predicate: impl Fn(&TypeRef) -> bool + Send + Sync + 'static) -> Self {
        self.is_foreign = Some(Arc::new(predicate));
        self
    }

    /// Treat every type whose full name does not start with `prefix` as foreign
    #[must_use]
    pub fn with_foreign_prefix(self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.with_foreign(move |reference| !reference.full_name().starts_with(&prefix))
    }

    /// Set the module-ownership callback
    #[must_use]
    pub fn with_module_of(mut self, module_of: impl Fn(&TypeRef) -> String + Send + Sync + 'static) -> Self {
        self.module_of = Some(Arc::new(module_of));
        self
    }

    /// Set the cycle policy
    #[must_use]
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// True if `reference` is a foreign type
    pub fn is_foreign(&self, reference: &TypeRef) -> bool {
        self.is_foreign
            .as_ref()
            .is_some_and(|predicate| predicate(reference))
    }

    /// The module `definition` belongs to
    pub fn module_of(&self, definition: &TypeRef) -> String {
        match &self.module_of {
            Some(module_of) => module_of(definition),
            None => definition.module.clone(),
        }
    }
}

impl fmt::Debug for RewriteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteConfig")
            .field("types_to_process", &self.types_to_process)
            .field("process_nested_types", &self.process_nested_types)
            .field("immutable_type_names", &self.immutable_type_names)
            .field("is_foreign", &self.is_foreign.is_some())
            .field("module_of", &self.module_of.is_some())
            .field("cycle_policy", &self.cycle_policy)
            .finish()
    }
}
