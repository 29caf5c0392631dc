//! Operand value representation.
//!
//! Every local variable and operand stack slot holds a [`Value`]. Values are
//! tagged, so typed bytecode (`iload`, `lload`, `aload`) collapses into one
//! untyped access at run time. Long and double values occupy a single entry
//! here; their two-slot width only matters to the verifier, which tracks
//! [`Category`](crate::Category) separately.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kind::{Category, ValueKind};

/// Opaque handle addressing a heap object.
///
/// The handle is an index into the heap's reference table, never a pointer.
/// Handle `0` is the universal null and never resolves to a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Reference(pub u32);

impl Reference {
    /// The null reference.
    pub const NULL: Reference = Reference(0);

    /// Returns true for the null handle.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Raw handle number.
    pub fn handle(self) -> u32 {
        self.0
    }

    /// Returns `None` for null, `Some(self)` otherwise.
    pub fn non_null(self) -> Option<Reference> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "@{}", self.0)
        }
    }
}

/// A value held in a local variable, operand stack slot or field.
///
/// Booleans, bytes, chars and shorts are widened to `Int` as in the class-file
/// execution model; narrowing happens only on array and field stores.
///
/// # Examples
///
/// ```
/// use core_types::{Category, Value};
///
/// assert_eq!(Value::Long(1).category(), Category::Two);
/// assert_eq!(Value::Int(1).category(), Category::One);
/// assert!(Value::null().is_null());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 32-bit integer (also boolean, byte, char, short)
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// IEEE 754 single precision
    Float(f32),
    /// IEEE 754 double precision
    Double(f64),
    /// Heap reference (possibly null)
    Ref(Reference),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl Value {
    /// The null reference value.
    pub fn null() -> Self {
        Value::Ref(Reference::NULL)
    }

    /// Default (zero) value for a field or array element of the given kind.
    pub fn zero_of(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Long => Value::Long(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Double => Value::Double(0.0),
            ValueKind::Reference => Value::null(),
            _ => Value::Int(0),
        }
    }

    /// Stack category of this value.
    pub fn category(&self) -> Category {
        match self {
            Value::Long(_) | Value::Double(_) => Category::Two,
            _ => Category::One,
        }
    }

    /// Returns the integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the long payload, if this is a `Long`.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float payload, if this is a `Float`.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the double payload, if this is a `Double`.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the reference payload, if this is a `Ref`.
    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            Value::Ref(r) => Some(*r),
            _ => None,
        }
    }

    /// True if this is a null reference.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Ref(r) if r.is_null())
    }

    /// Narrows an `Int` to the storage width of `kind`, as field and array
    /// stores do. Other values pass through unchanged.
    pub fn narrow_to(self, kind: ValueKind) -> Self {
        match (self, kind) {
            (Value::Int(v), ValueKind::Boolean) => Value::Int(v & 1),
            (Value::Int(v), ValueKind::Byte) => Value::Int(v as i8 as i32),
            (Value::Int(v), ValueKind::Char) => Value::Int(v as u16 as i32),
            (Value::Int(v), ValueKind::Short) => Value::Int(v as i16 as i32),
            (other, _) => other,
        }
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Ref(r)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Float(v) => write!(f, "{}f", v),
            Value::Double(v) => write!(f, "{}d", v),
            Value::Ref(r) => write!(f, "{}", r),
        }
    }
}
