//! Runtime values of the emulator.

use std::{fmt, sync::Arc};

use uguid::Guid;

use crate::{metadata::typesystem::TypeRef, runtime::ChangeTracker};

/// Runtime value during emulation.
///
/// | Declared type | `EmValue` variant |
/// |---------------|-------------------|
/// | `bool` | [`EmValue::Bool`] |
/// | `int8` .. `uint32`, `char`, enumerations | [`EmValue::I32`] |
/// | `int64`, `uint64`, `DateTime` (ticks) | [`EmValue::I64`] |
/// | `float32`, `float64`, `decimal` | [`EmValue::F64`] |
/// | `string` | [`EmValue::String`] |
/// | `Guid` | [`EmValue::Guid`] |
/// | class instance | [`EmValue::ObjectRef`] |
/// | `ChangeTracker` | [`EmValue::Tracker`] |
///
/// # Equality
///
/// Equality follows `Object.Equals` on boxed values: primitives, strings and guids compare by
/// value, objects and trackers by reference. Values of different kinds are never equal.
#[derive(Clone, Debug)]
pub enum EmValue {
    /// Null reference
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    I32(i32),
    /// 64-bit integer
    I64(i64),
    /// Floating point
    F64(f64),
    /// Immutable string
    String(Arc<str>),
    /// Unique identifier
    Guid(Guid),
    /// Reference to an object on the managed heap
    ObjectRef(HeapRef),
    /// A change tracker instance, implemented natively
    Tracker(Arc<ChangeTracker>),
}

impl EmValue {
    /// Returns true for the null reference
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, EmValue::Null)
    }

    /// Returns true if the value is a change tracker
    #[must_use]
    pub fn is_tracker(&self) -> bool {
        matches!(self, EmValue::Tracker(_))
    }

    /// The heap reference, if the value is an object
    #[must_use]
    pub fn as_object(&self) -> Option<HeapRef> {
        match self {
            EmValue::ObjectRef(object) => Some(*object),
            _ => None,
        }
    }

    /// The tracker, if the value is one
    #[must_use]
    pub fn as_tracker(&self) -> Option<&Arc<ChangeTracker>> {
        match self {
            EmValue::Tracker(tracker) => Some(tracker),
            _ => None,
        }
    }

    /// The zero value of a field or local of declared type `declared`.
    ///
    /// Enumerations are not recognizable from a reference alone; the caller passes
    /// `is_enum` after resolving the type.
    #[must_use]
    pub fn default_for(declared: &TypeRef, is_enum: bool) -> EmValue {
        if is_enum {
            return EmValue::I32(0);
        }
        if declared.is_array || declared.module != crate::metadata::corlib::CORLIB {
            return EmValue::Null;
        }
        match declared.full_name().as_str() {
            "System.Boolean" => EmValue::Bool(false),
            "System.Byte" | "System.SByte" | "System.Int16" | "System.UInt16" | "System.Int32"
            | "System.UInt32" | "System.Char" => EmValue::I32(0),
            "System.Int64" | "System.UInt64" | "System.DateTime" => EmValue::I64(0),
            "System.Single" | "System.Double" | "System.Decimal" => EmValue::F64(0.0),
            "System.Guid" => EmValue::Guid(Guid::ZERO),
            _ => EmValue::Null,
        }
    }
}

impl PartialEq for EmValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EmValue::Null, EmValue::Null) => true,
            (EmValue::Bool(a), EmValue::Bool(b)) => a == b,
            (EmValue::I32(a), EmValue::I32(b)) => a == b,
            (EmValue::I64(a), EmValue::I64(b)) => a == b,
            // Double.Equals treats NaN as equal to itself
            (EmValue::F64(a), EmValue::F64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (EmValue::String(a), EmValue::String(b)) => a == b,
            (EmValue::Guid(a), EmValue::Guid(b)) => a == b,
            (EmValue::ObjectRef(a), EmValue::ObjectRef(b)) => a == b,
            (EmValue::Tracker(a), EmValue::Tracker(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for EmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmValue::Null => write!(f, "null"),
            EmValue::Bool(value) => write!(f, "{value}"),
            EmValue::I32(value) => write!(f, "{value}"),
            EmValue::I64(value) => write!(f, "{value}L"),
            EmValue::F64(value) => write!(f, "{value}"),
            EmValue::String(value) => write!(f, "{value:?}"),
            EmValue::Guid(value) => write!(f, "{value}"),
            EmValue::ObjectRef(object) => write!(f, "{object}"),
            EmValue::Tracker(tracker) => write!(f, "ChangeTracker({})", tracker.target()),
        }
    }
}

impl From<bool> for EmValue {
    fn from(value: bool) -> Self {
        EmValue::Bool(value)
    }
}

impl From<i32> for EmValue {
    fn from(value: i32) -> Self {
        EmValue::I32(value)
    }
}

impl From<i64> for EmValue {
    fn from(value: i64) -> Self {
        EmValue::I64(value)
    }
}

impl From<f64> for EmValue {
    fn from(value: f64) -> Self {
        EmValue::F64(value)
    }
}

impl From<&str> for EmValue {
    fn from(value: &str) -> Self {
        EmValue::String(Arc::from(value))
    }
}

impl From<String> for EmValue {
    fn from(value: String) -> Self {
        EmValue::String(Arc::from(value))
    }
}

impl From<Guid> for EmValue {
    fn from(value: Guid) -> Self {
        EmValue::Guid(value)
    }
}

impl From<HeapRef> for EmValue {
    fn from(value: HeapRef) -> Self {
        EmValue::ObjectRef(value)
    }
}

/// Reference to a heap-allocated object.
///
/// Two `HeapRef` values are equal if they point to the same heap object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapRef(pub(crate) u64);

impl HeapRef {
    /// Creates a new heap reference with the given ID.
    #[must_use]
    pub fn new(id: u64) -> Self {
        HeapRef(id)
    }

    /// Returns the internal ID of this heap reference.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapRef({})", self.0)
    }
}
