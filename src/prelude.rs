//! # dotweave Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotweave library. Import this module to get quick access to the essential
//! types for weaving modules and running them.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotweave operations
pub use crate::Error;

/// The result type used throughout dotweave
pub use crate::Result;

// ================================================================================================
// Module Model
// ================================================================================================

/// The module arena
pub use crate::Module;

/// Row handles and type references
pub use crate::metadata::{
    token::Token,
    typesystem::{TypeAttributes, TypeDef, TypeRef},
};

/// Member definitions and references
pub use crate::metadata::{
    field::{FieldAttributes, FieldRef},
    method::{MethodAttributes, MethodBody, MethodRef, Param},
    property::PropertyDef,
};

/// The synthesized core library
pub use crate::metadata::corlib;

/// Cross-module resolution
pub use crate::metadata::resolver::ModuleResolver;

// ================================================================================================
// Authoring
// ================================================================================================

/// Instruction set and body assembler
pub use crate::assembly::{Instruction, InstructionAssembler};

/// Type and property builders
pub use crate::builders::{PropertyBuilder, TypeBuilder};

// ================================================================================================
// Weaving
// ================================================================================================

/// The rewriter and its configuration
pub use crate::changetracking::{
    weave_module, ChangeTrackingRewriter, CyclePolicy, RewriteConfig, RewriteReport,
};

// ================================================================================================
// Runtime and Emulation
// ================================================================================================

/// The native change tracker
pub use crate::runtime::{ChangeTracker, Listener, TrackerLookup};

/// The emulator and its values
pub use crate::emulation::{EmValue, Emulator, HeapRef};
