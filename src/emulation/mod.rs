//! Emulation of module code.
//!
//! The emulator executes the straight-line IL of property accessors, constructors and
//! methods so that woven modules can be exercised end to end: create an instance, subscribe
//! to its tracker, assign properties and observe the notifications.
//!
//! # Key Components
//!
//! - [`crate::emulation::Emulator`] - Interpreter with virtual dispatch and native runtime methods
//! - [`crate::emulation::EmValue`] - Runtime value representation
//! - [`crate::emulation::HeapRef`] - Reference to a heap-allocated object
//! - [`crate::emulation::ManagedHeap`] - Object storage
//!
//! # Limits
//!
//! Type initializers are never run, static fields are not modelled and nested calls are
//! bounded by [`DEFAULT_MAX_CALL_DEPTH`] unless configured otherwise with
//! [`Emulator::with_max_call_depth`]. Exceeding the bound fails with
//! [`crate::Error::RecursionLimit`].

mod engine;
mod heap;
mod value;

pub use engine::{Emulator, DEFAULT_MAX_CALL_DEPTH};
pub use heap::{HeapObject, ManagedHeap};
pub use value::{EmValue, HeapRef};
