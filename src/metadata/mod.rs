//! Module metadata: the in-memory type graph the weaver operates on.
//!
//! # Key Components
//!
//! - [`module`] - The [`Module`](module::Module) arena of types, fields, methods and properties
//! - [`token`] - Row handles used for every intra-module cross reference
//! - [`typesystem`] - Type references and type definitions
//! - [`method`] - Method definitions, references and IL bodies
//! - [`resolver`] - Cross-module resolution of type references
//! - [`corlib`] - The synthesized core library
//!
//! # Examples
//!
//! ```rust
//! use dotweave::metadata::{corlib, resolver::ModuleResolver, typesystem::TypeAttributes};
//! use dotweave::Module;
//!
//! let mut module = Module::new("Contracts");
//! let entity = module.add_type("Contracts", "Entity", TypeAttributes::PUBLIC, Some(corlib::object()))?;
//!
//! let resolver = ModuleResolver::new()?;
//! let base = module.type_def(entity)?.base.clone();
//! if let Some(base) = base {
//!     let (corlib, object) = resolver.resolve_type(&base)?;
//!     assert_eq!(corlib.type_full_name(object)?, "System.Object");
//! }
//! # Ok::<(), dotweave::Error>(())
//! ```

/// The synthesized core library
pub mod corlib;
/// Implementation of custom attributes
pub mod customattributes;
/// Implementation of field definitions and references
pub mod field;
/// Implementation of methods and method bodies
pub mod method;
/// Implementation of the module arena
pub mod module;
/// Implementation of property definitions
pub mod property;
/// Cross-module resolution
pub mod resolver;
/// Implementation of the row handles
pub mod token;
/// Implementation of type references and definitions
pub mod typesystem;
