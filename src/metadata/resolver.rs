//! Resolution of modules and type references across module boundaries.
//!
//! A [`TypeRef`] names the module that declares the type. [`ModuleResolver`] turns such a
//! reference into the defining module and type token, loading referenced module images on
//! demand from a list of search directories (`<dir>/<name>.dwm`). Loaded modules are
//! cached for the lifetime of the resolver. The synthesized core library and the runtime
//! support module are always available.
//!
//! # Examples
//!
//! ```rust
//! use dotweave::metadata::{corlib, resolver::ModuleResolver};
//!
//! let resolver = ModuleResolver::new()?;
//! let (module, token) = resolver.resolve_type(&corlib::string())?;
//! assert_eq!(module.name, "mscorlib");
//! assert!(!module.type_def(token)?.is_value_type());
//! # Ok::<(), dotweave::Error>(())
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;

use crate::{
    file::IMAGE_EXTENSION,
    metadata::{corlib, module::Module, token::Token, typesystem::TypeRef},
    runtime, Error, Result,
};

/// Resolves module names and type references to loaded modules.
pub struct ModuleResolver {
    modules: DashMap<String, Arc<Module>>,
    search_dirs: Vec<PathBuf>,
}

impl ModuleResolver {
    /// Create a resolver providing the core library and the runtime support module
    ///
    /// # Errors
    ///
    /// Only fails if the synthesized modules are inconsistent, which indicates a bug.
    pub fn new() -> Result<Self> {
        let resolver = ModuleResolver {
            modules: DashMap::new(),
            search_dirs: Vec::new(),
        };
        resolver.register(corlib::corlib_module()?);
        resolver.register(runtime::runtime_module()?);
        Ok(resolver)
    }

    /// Add a directory searched for module images
    #[must_use]
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.add_search_dir(dir);
        self
    }

    /// Add a directory searched for module images
    pub fn add_search_dir(&mut self, dir: impl Into<PathBuf>) {
        self.search_dirs.push(dir.into());
    }

    /// Make `module` resolvable, replacing a module of the same name
    pub fn register(&self, module: Module) -> Arc<Module> {
        let module = Arc::new(module);
        self.modules.insert(module.name.clone(), module.clone());
        module
    }

    /// Names of the modules loaded so far
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.iter().map(|m| m.key().clone()).collect();
        names.sort();
        names
    }

    /// Resolve a module by name, loading it from the search directories if necessary
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModuleNotFound`] if no search directory holds an image of the module,
    /// or the error of loading the image.
    pub fn resolve_module(&self, name: &str) -> Result<Arc<Module>> {
        if let Some(module) = self.modules.get(name) {
            return Ok(module.clone());
        }

        let Some(path) = self.locate(name) else {
            return Err(Error::ModuleNotFound(format!(
                "{} (searched {} directories)",
                name,
                self.search_dirs.len()
            )));
        };
        let module = Module::from_file(&path)?;
        if module.name != name {
            return Err(malformed_error!(
                "{} declares module {} instead of {}",
                path.display(),
                module.name,
                name
            ));
        }
        log::debug!("loaded module {} from {}", name, path.display());

        let module = self
            .modules
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(module))
            .clone();
        Ok(module)
    }

    /// Resolve a type reference to its defining module and type token.
    ///
    /// Array and generic decorations are ignored: an array resolves to its element type and
    /// a generic instance to its generic definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModuleNotFound`] if the declaring module cannot be loaded and
    /// [`Error::TypeNotFound`] if it does not define the type.
    pub fn resolve_type(&self, reference: &TypeRef) -> Result<(Arc<Module>, Token)> {
        let module = self.resolve_module(&reference.module)?;
        match module.find_type(&reference.full_name()) {
            Some(token) => Ok((module, token)),
            None => Err(Error::TypeNotFound(reference.definition().to_string())),
        }
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.search_dirs
            .iter()
            .map(|dir| image_path(dir, name))
            .find(|path| path.is_file())
    }
}

/// Path of the image of module `name` in `dir`
pub fn image_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{IMAGE_EXTENSION}"))
}
