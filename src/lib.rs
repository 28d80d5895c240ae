// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/mod.rs' uses mmap to map a file into memory

//! # dotweave
//!
//! A change-tracking weaver for CIL-style modules. `dotweave` instruments the property
//! setters of a module so that, at runtime, writing a property of an object notifies the
//! subscribers of that object and of every object that references it through an
//! instrumented property. It retrofits mutable data models with dirty tracking without
//! hand-written notification code.
//!
//! ## Features
//!
//! - **Declarative roots** - Annotate the top of a hierarchy with `TrackChangesAttribute`
//! - **Hierarchy aware** - Bases are woven before derived types, referenced types before
//!   the types referencing them, across module boundaries
//! - **Idempotent** - Woven types carry a marker; re-running on a woven module is a no-op
//! - **Safe persistence** - Module images are replaced atomically and only after a
//!   successful run
//! - **Executable** - A small emulator runs woven modules, so behaviour can be verified
//!   end to end
//!
//! ## Quick Start
//!
//! ```rust
//! use dotweave::prelude::*;
//!
//! let mut module = Module::new("Contracts");
//! TypeBuilder::class("Contracts", "Contractor")
//!     .track_changes()
//!     .auto_property("Name", corlib::string())
//!     .build(&mut module)?;
//!
//! let report = ChangeTrackingRewriter::new(RewriteConfig::default())?.rewrite(&mut module)?;
//! println!("{report}");
//! # Ok::<(), dotweave::Error>(())
//! ```
//!
//! Weaving a module image on disk:
//!
//! ```rust,no_run
//! use dotweave::changetracking::{weave_module, RewriteConfig};
//!
//! let config = RewriteConfig::default()
//!     .with_foreign_prefix("Contracts.")
//!     .with_immutable_type("BsonTimestamp");
//! let report = weave_module("build/Contracts.dwm", config)?;
//! println!("{report}");
//! # Ok::<(), dotweave::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - The in-memory module graph: types, fields, methods, properties, tokens
//! - [`assembly`] - The instruction set of method bodies
//! - [`builders`] - Authoring types the way a compiler lays them out
//! - [`runtime`] - The runtime support module and the native [`runtime::ChangeTracker`]
//! - [`changetracking`] - The weaver
//! - [`emulation`] - Execution of module code
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] with the crate-wide [`Error`] type.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotweave::prelude::*;
///
/// let module = Module::new("Contracts");
/// assert!(module.all_types().is_empty());
/// ```
pub mod prelude;

/// The instruction set of method bodies
///
/// # Key Types
///
/// - [`assembly::Instruction`] - One instruction with its operand
/// - [`assembly::InstructionAssembler`] - Fluent builder for method bodies
///
/// # Examples
///
/// ```rust
/// use dotweave::assembly::{Instruction, InstructionAssembler};
///
/// let body = InstructionAssembler::new().ldarg_0().ldnull().ret().finish();
/// assert_eq!(body.max_stack, 2);
/// assert_eq!(body.instructions.last(), Some(&Instruction::Ret));
/// ```
pub mod assembly;

/// Builders for authoring module content
pub mod builders;

/// Weaving change tracking into modules
pub mod changetracking;

/// Execution of module code
pub mod emulation;

/// The in-memory module graph
pub mod metadata;

/// Runtime support definitions and the native change tracker
pub mod runtime;

/// `dotweave` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotweave` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust,no_run
/// use dotweave::{Error, Module};
/// use std::path::Path;
///
/// match Module::from_file(Path::new("Contracts.dwm")) {
///     Ok(module) => println!("{} types", module.all_types().len()),
///     Err(Error::Serialization(e)) => eprintln!("not a module image: {e}"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
pub use error::Error;

/// The module arena, loaded from and saved to module images
pub use metadata::module::Module;
