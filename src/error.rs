use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Module Image Errors
/// - [`Error::Malformed`] - Inconsistent module graph (dangling tokens, broken bodies)
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Serialization`] - The module image could not be encoded or decoded
///
/// ## Resolution Errors
/// - [`Error::ModuleNotFound`] - A referenced module could not be located
/// - [`Error::TypeNotFound`] - A type reference does not resolve to a definition
/// - [`Error::MemberNotFound`] - A field, method or property reference does not resolve
///
/// ## Weaving Errors
/// - [`Error::NotRewrittenReference`] - A property references a foreign type that was never woven
/// - [`Error::NotRewrittenBase`] - A base type lives in a foreign module that was never woven
/// - [`Error::CyclicReference`] - The type walk revisited a type that is still being woven
/// - [`Error::Configuration`] - Invalid invocation or configuration
///
/// ## Emulation Errors
/// - [`Error::RecursionLimit`] - Maximum call depth exceeded
/// - [`Error::Emulation`] - Invalid program state while executing a method body
///
/// # Examples
///
/// ```rust,no_run
/// use dotweave::{Error, Module};
/// use std::path::Path;
///
/// match Module::from_file(Path::new("Contracts.dwm")) {
///     Ok(module) => println!("loaded {}", module.name),
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The module graph is internally inconsistent.
    ///
    /// The error includes the source location where the inconsistency was detected
    /// for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The module image could not be serialized or deserialized.
    #[error("Invalid module image - {0}")]
    Serialization(#[from] serde_json::Error),

    /// A module referenced by name could not be located by the resolver.
    #[error("Failed to resolve module - {0}")]
    ModuleNotFound(String),

    /// A type reference could not be resolved to a definition.
    ///
    /// The associated value is the assembly-qualified name of the reference.
    #[error("Failed to resolve type - {0}")]
    TypeNotFound(String),

    /// A member reference could not be resolved to a definition.
    #[error("Failed to resolve member - {0}")]
    MemberNotFound(String),

    /// A woven property's declared type lives in another module that has not been
    /// processed yet. Cross-module references must already be instrumented, the
    /// weaver never edits a module it does not own.
    #[error("property {property} of type {owner} references not rewritten type {target} from module {module}")]
    NotRewrittenReference {
        /// Name of the offending property
        property: String,
        /// Full name of the type declaring the property
        owner: String,
        /// Full name of the referenced type
        target: String,
        /// Module the referenced type belongs to
        module: String,
    },

    /// A type inherits from a type in another module that has not been processed yet.
    #[error("base type {base} of type {owner} from module {module} is not rewritten")]
    NotRewrittenBase {
        /// Full name of the derived type
        owner: String,
        /// Full name of the base type
        base: String,
        /// Module the base type belongs to
        module: String,
    },

    /// The type walk came back to a type that is still being processed.
    ///
    /// The associated value lists the chain of types, outermost first.
    #[error("cyclic type reference - {0}")]
    CyclicReference(String),

    /// Invalid invocation or configuration.
    #[error("Invalid configuration - {0}")]
    Configuration(String),

    /// Recursion limit reached.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The emulator hit an invalid program state.
    #[error("Emulation failed - {0}")]
    Emulation(String),
}
