//! The hierarchy walk driving a change-tracking rewrite.
//!
//! Each call to [`ChangeTrackingRewriter::rewrite`] builds a fresh, memoized view of the
//! type graph. Nodes are created lazily, keyed by the assembly-qualified full name of the
//! type, and record the base type node, whether the hierarchy carries the tracking root
//! marker and the tracker field once known. Each node moves from visited to in progress
//! to rewritten exactly once.
//!
//! Bases are processed before derived types and property types before the types
//! referencing them. Types of other modules are never woven: a reference to one that does
//! not carry the processed marker fails the whole run.

use std::{collections::HashMap, collections::HashSet, fmt, path::Path, sync::Arc};

use crate::{
    changetracking::{
        weaver::{tracker_field, TypeWeaver},
        CyclePolicy, EligibilityScheme, RewriteConfig,
    },
    metadata::{
        field::FieldRef,
        module::Module,
        resolver::ModuleResolver,
        token::Token,
        typesystem::{TypeDef, TypeRef, OBJECT_TYPE},
    },
    runtime::{REWRITTEN_ATTRIBUTE, TRACK_CHANGES_ATTRIBUTE},
    Error, Result,
};

/// Statistics of one rewrite run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Types woven by this run
    pub types_woven: usize,
    /// Types found already woven by an earlier run
    pub types_reused: usize,
    /// Tracker fields added
    pub trackers_installed: usize,
    /// Property setters instrumented
    pub properties_instrumented: usize,
}

impl fmt::Display for RewriteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} types woven, {} reused, {} trackers installed, {} properties instrumented",
            self.types_woven, self.types_reused, self.trackers_installed, self.properties_instrumented
        )
    }
}

/// Weaves change tracking into modules.
///
/// # Examples
///
/// ```rust
/// use dotweave::builders::TypeBuilder;
/// use dotweave::changetracking::{ChangeTrackingRewriter, RewriteConfig};
/// use dotweave::metadata::corlib;
/// use dotweave::Module;
///
/// let mut module = Module::new("Contracts");
/// TypeBuilder::class("Contracts", "Contractor")
///     .track_changes()
///     .auto_property("Name", corlib::string())
///     .build(&mut module)?;
///
/// let rewriter = ChangeTrackingRewriter::new(RewriteConfig::default())?;
/// let report = rewriter.rewrite(&mut module)?;
/// assert_eq!(report.types_woven, 1);
/// assert_eq!(report.properties_instrumented, 1);
///
/// // a second run finds the marker and changes nothing
/// let again = rewriter.rewrite(&mut module)?;
/// assert_eq!((again.types_woven, again.types_reused), (0, 1));
/// # Ok::<(), dotweave::Error>(())
/// ```
pub struct ChangeTrackingRewriter {
    config: RewriteConfig,
    resolver: ModuleResolver,
}

impl ChangeTrackingRewriter {
    /// Create a rewriter resolving references against the core library and runtime module
    ///
    /// # Errors
    ///
    /// Only fails if the synthesized modules are inconsistent, which indicates a bug.
    pub fn new(config: RewriteConfig) -> Result<Self> {
        Ok(Self::with_resolver(config, ModuleResolver::new()?))
    }

    /// Create a rewriter resolving references to other modules through `resolver`
    pub fn with_resolver(config: RewriteConfig, resolver: ModuleResolver) -> Self {
        ChangeTrackingRewriter { config, resolver }
    }

    /// The configuration
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Mutable access to the configuration for the next run
    pub fn config_mut(&mut self) -> &mut RewriteConfig {
        &mut self.config
    }

    /// The resolver used for references to other modules
    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Weave change tracking into `module`.
    ///
    /// On error the module may be partially modified and must not be persisted.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRewrittenReference`] if an instrumented property references a type of
    ///   another module that has not been woven
    /// - [`Error::NotRewrittenBase`] if a base type inside the hierarchy of a tracking root
    ///   belongs to another module that has not been woven
    /// - [`Error::CyclicReference`] on cyclic property graphs with [`CyclePolicy::Fail`]
    /// - [`Error::TypeNotFound`] / [`Error::ModuleNotFound`] for unresolvable references
    pub fn rewrite(&self, module: &mut Module) -> Result<RewriteReport> {
        let mut run = RewriteRun {
            module,
            config: &self.config,
            resolver: &self.resolver,
            scheme: EligibilityScheme::new(&self.config),
            nodes: Vec::new(),
            index: HashMap::new(),
            creating: HashSet::new(),
            report: RewriteReport::default(),
        };
        run.execute()
    }

    /// Load the module image at `path`, weave it and write it back.
    ///
    /// The file is only replaced after the whole walk succeeded.
    ///
    /// # Errors
    ///
    /// Returns the load, rewrite or save error; the file is untouched in every case.
    pub fn weave_file(&self, path: &Path) -> Result<RewriteReport> {
        let mut module = Module::from_file(path)?;
        let report = self.rewrite(&mut module)?;
        module.write_to_file(path)?;
        Ok(report)
    }
}

/// Weave the module image at `path` in place, resolving referenced modules from the same
/// directory.
///
/// # Errors
///
/// See [`ChangeTrackingRewriter::weave_file`].
pub fn weave_module(path: impl AsRef<Path>, config: RewriteConfig) -> Result<RewriteReport> {
    let path = path.as_ref();
    let mut resolver = ModuleResolver::new()?;
    if let Some(dir) = path.parent() {
        resolver.add_search_dir(dir);
    }
    ChangeTrackingRewriter::with_resolver(config, resolver).weave_file(path)
}

enum Location {
    Local(Token),
    Foreign(Arc<Module>, Token),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeState {
    Visited,
    InProgress,
    Rewritten,
}

struct TypeNode {
    reference: TypeRef,
    location: Location,
    parent: Option<usize>,
    hierarchy_marked: bool,
    tracker_field: Option<FieldRef>,
    state: NodeState,
}

struct RewriteRun<'a> {
    module: &'a mut Module,
    config: &'a RewriteConfig,
    resolver: &'a ModuleResolver,
    scheme: EligibilityScheme<'a>,
    nodes: Vec<TypeNode>,
    index: HashMap<String, usize>,
    creating: HashSet<String>,
    report: RewriteReport,
}

impl RewriteRun<'_> {
    fn execute(&mut self) -> Result<RewriteReport> {
        let mut roots = Vec::new();
        for token in self.candidates()? {
            let def = self.module.type_def(token)?;
            if !self.scheme.needs_tracking_root(def) {
                if def.has_attribute(TRACK_CHANGES_ATTRIBUTE) {
                    log::warn!(
                        "{} is marked for tracking but cannot be a tracking root",
                        self.module.type_full_name(token)?
                    );
                }
                continue;
            }
            let reference = self.module.type_ref(token)?;
            let id = self.node(&reference)?;
            if self.nodes[id].hierarchy_marked {
                roots.push(id);
            }
        }

        for id in roots {
            self.ensure_rewritten(id)?;
        }
        log::info!("module {}: {}", self.module.name, self.report);
        Ok(self.report)
    }

    fn candidates(&self) -> Result<Vec<Token>> {
        match &self.config.types_to_process {
            Some(names) => names
                .iter()
                .map(|name| {
                    self.module
                        .find_type(name)
                        .ok_or_else(|| Error::TypeNotFound(format!("[{}]{}", self.module.name, name)))
                })
                .collect(),
            None => Ok(self.module.all_types()),
        }
    }

    fn locate(&self, definition: &TypeRef) -> Result<Location> {
        if definition.module == self.module.name {
            return self
                .module
                .find_type(&definition.full_name())
                .map(Location::Local)
                .ok_or_else(|| Error::TypeNotFound(definition.to_string()));
        }
        let (module, token) = self.resolver.resolve_type(definition)?;
        Ok(Location::Foreign(module, token))
    }

    fn def<'s>(&'s self, location: &'s Location) -> Result<&'s TypeDef> {
        match location {
            Location::Local(token) => self.module.type_def(*token),
            Location::Foreign(module, token) => module.type_def(*token),
        }
    }

    fn full_name(&self, location: &Location) -> Result<String> {
        match location {
            Location::Local(token) => self.module.type_full_name(*token),
            Location::Foreign(module, token) => module.type_full_name(*token),
        }
    }

    /// The memoized node of `reference`, creating it and its base chain on first use
    fn node(&mut self, reference: &TypeRef) -> Result<usize> {
        let definition = reference.definition();
        let key = definition.to_string();
        if let Some(&id) = self.index.get(&key) {
            return Ok(id);
        }
        if !self.creating.insert(key.clone()) {
            return Err(malformed_error!("inheritance chain of {} loops", key));
        }

        let location = self.locate(&definition)?;
        let (marked, base) = {
            let def = self.def(&location)?;
            (def.has_attribute(TRACK_CHANGES_ATTRIBUTE), def.base.clone())
        };
        let parent = match base {
            Some(base) if !base.is(OBJECT_TYPE) && !marked && !self.config.is_foreign(&base) => {
                Some(self.node(&base)?)
            }
            _ => None,
        };
        self.creating.remove(&key);

        let hierarchy_marked = marked || parent.is_some_and(|parent| self.nodes[parent].hierarchy_marked);
        let id = self.nodes.len();
        self.nodes.push(TypeNode {
            reference: definition,
            location,
            parent,
            hierarchy_marked,
            tracker_field: None,
            state: NodeState::Visited,
        });
        self.index.insert(key, id);
        Ok(id)
    }

    fn ensure_rewritten(&mut self, id: usize) -> Result<()> {
        match self.nodes[id].state {
            NodeState::Rewritten => return Ok(()),
            NodeState::InProgress => {
                return match self.config.cycle_policy {
                    CyclePolicy::Fail => Err(Error::CyclicReference(self.nodes[id].reference.to_string())),
                    CyclePolicy::Accept => Ok(()),
                }
            }
            NodeState::Visited => {}
        }
        self.nodes[id].state = NodeState::InProgress;

        if let Some(parent) = self.nodes[id].parent {
            self.check_base_rewritable(id, parent)?;
            self.ensure_rewritten(parent)?;
        }

        if self.def(&self.nodes[id].location)?.has_attribute(REWRITTEN_ATTRIBUTE) {
            let tracker = match self.nodes[id].parent {
                Some(parent) => self.inherited_tracker(parent)?,
                None => self.existing_tracker(id)?,
            };
            let node = &mut self.nodes[id];
            node.tracker_field = Some(tracker);
            node.state = NodeState::Rewritten;
            self.report.types_reused += 1;
            log::debug!("{} is already rewritten", self.nodes[id].reference);
            return Ok(());
        }

        let &Location::Local(token) = &self.nodes[id].location else {
            let reference = &self.nodes[id].reference;
            return Err(Error::Configuration(format!(
                "type {} belongs to module {} and cannot be rewritten as part of {}",
                reference.full_name(),
                reference.module,
                self.module.name
            )));
        };

        let tracker = match self.nodes[id].parent {
            Some(parent) => {
                let tracker = self.inherited_tracker(parent)?;
                self.module.import_field(&tracker)
            }
            None => {
                let installed = TypeWeaver::new(&mut *self.module).install_tracker(token)?;
                if installed.installed {
                    self.report.trackers_installed += 1;
                }
                installed.field
            }
        };
        self.nodes[id].tracker_field = Some(tracker.clone());

        let properties = self.module.type_def(token)?.properties.clone();
        for property in properties {
            if !TypeWeaver::new(&mut *self.module).try_instrument_property(property, &tracker)? {
                continue;
            }
            self.report.properties_instrumented += 1;
            self.follow_property(id, property)?;
        }

        TypeWeaver::new(&mut *self.module).mark_processed(token)?;
        self.nodes[id].state = NodeState::Rewritten;
        self.report.types_woven += 1;
        log::debug!("rewrote {}", self.nodes[id].reference);
        Ok(())
    }

    /// Ensure the declared type of an instrumented property is woven, if it needs to be
    fn follow_property(&mut self, owner: usize, property: Token) -> Result<()> {
        let (name, property_type) = {
            let def = self.module.property(property)?;
            (def.name.clone(), def.property_type.definition())
        };

        let location = self.locate(&property_type)?;
        let target = self.full_name(&location)?;
        let (needs_tracking, processed) = {
            let def = self.def(&location)?;
            (
                self.scheme.needs_tracking_for_property_type(def, &target),
                def.has_attribute(REWRITTEN_ATTRIBUTE),
            )
        };
        if !needs_tracking {
            return Ok(());
        }

        let module = self.config.module_of(&property_type);
        if module != self.module.name && !processed {
            return Err(Error::NotRewrittenReference {
                property: name,
                owner: self.nodes[owner].reference.full_name(),
                target,
                module,
            });
        }

        let child = self.node(&property_type)?;
        self.ensure_rewritten(child)
    }

    fn check_base_rewritable(&self, id: usize, parent: usize) -> Result<()> {
        let base = &self.nodes[parent];
        let module = self.config.module_of(&base.reference);
        if module == self.module.name || self.def(&base.location)?.has_attribute(REWRITTEN_ATTRIBUTE) {
            return Ok(());
        }
        Err(Error::NotRewrittenBase {
            owner: self.nodes[id].reference.full_name(),
            base: base.reference.full_name(),
            module,
        })
    }

    fn inherited_tracker(&self, parent: usize) -> Result<FieldRef> {
        let parent = &self.nodes[parent];
        parent
            .tracker_field
            .clone()
            .ok_or_else(|| Error::CyclicReference(parent.reference.to_string()))
    }

    /// The tracker field installed by an earlier run, imported into the module being rewritten
    fn existing_tracker(&mut self, id: usize) -> Result<FieldRef> {
        let field = match &self.nodes[id].location {
            Location::Local(token) => {
                let module: &Module = self.module;
                tracker_field(module, module.type_def(*token)?)
                    .map(|field| module.field_ref(field))
                    .transpose()?
            }
            Location::Foreign(module, token) => tracker_field(module, module.type_def(*token)?)
                .map(|field| module.field_ref(field))
                .transpose()?,
        };
        match field {
            Some(field) => Ok(self.module.import_field(&field)),
            None => Err(malformed_error!(
                "{} is marked rewritten but has no tracker field",
                self.nodes[id].reference
            )),
        }
    }
}
