//! Change-tracking weaving.
//!
//! Instruments the types of a module so that, at runtime, writing a property of an object
//! notifies the subscribers of that object and of every object referencing it through an
//! instrumented property.
//!
//! # Architecture
//!
//! - [`EligibilityScheme`] - Which types can be tracking roots and which property types
//!   must themselves be woven
//! - [`TypeWeaver`] - Edits one type: tracker field, constructor initialization,
//!   `ITrackable`, setter instrumentation and the processed marker
//! - [`ChangeTrackingRewriter`] - Walks the type hierarchy in dependency order and
//!   enforces the cross-module rules
//! - [`RewriteConfig`] - Input of a run
//!
//! # Tracking roots
//!
//! A type annotated with `TrackChangesAttribute` is a tracking root. It receives its own
//! tracker field; derived types inside the rewrite scope share it. Types outside any
//! tracking-root hierarchy are left untouched unless an instrumented property references
//! them, in which case they are woven as roots of their own.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//! use dotweave::builders::TypeBuilder;
//! use dotweave::changetracking::{ChangeTrackingRewriter, RewriteConfig};
//! use dotweave::emulation::Emulator;
//! use dotweave::metadata::corlib;
//! use dotweave::Module;
//!
//! let mut module = Module::new("Contracts");
//! TypeBuilder::class("Contracts", "Contractor")
//!     .track_changes()
//!     .auto_property("Name", corlib::string())
//!     .build(&mut module)?;
//! ChangeTrackingRewriter::new(RewriteConfig::default())?.rewrite(&mut module)?;
//!
//! let mut emulator = Emulator::new()?;
//! emulator.load(module);
//! let contractor = emulator.create_instance("Contracts", "Contracts.Contractor", &[])?;
//!
//! let changes = Arc::new(AtomicUsize::new(0));
//! let counter = changes.clone();
//! if let Some(tracker) = emulator.tracker_of(contractor) {
//!     tracker.subscribe(Arc::new(move |_| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }));
//! }
//!
//! emulator.set_property(contractor, "Name", "ivan".into())?;
//! emulator.set_property(contractor, "Name", "vasyly".into())?;
//! emulator.set_property(contractor, "Name", "vasyly".into())?;
//! assert_eq!(changes.load(Ordering::SeqCst), 2);
//! # Ok::<(), dotweave::Error>(())
//! ```

mod config;
mod rewriter;
mod scheme;
mod weaver;

pub use config::{CyclePolicy, ForeignPredicate, ModuleOf, RewriteConfig};
pub use rewriter::{weave_module, ChangeTrackingRewriter, RewriteReport};
pub use scheme::EligibilityScheme;
pub use weaver::{tracker_field, TrackerField, TypeWeaver, TRACKER_FIELD};
