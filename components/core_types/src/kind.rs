//! Value kinds and allocation-accounting weights.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Accounting weight charged for every object header.
///
/// This is an allocation-accounting unit that drives the overflow policy, not
/// a real memory layout.
pub const OBJECT_HEADER_WEIGHT: usize = 8;

/// Verifier stack category. Longs and doubles take two slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// One slot (int, float, reference)
    One,
    /// Two slots (long, double)
    Two,
}

impl Category {
    /// Number of slots occupied.
    pub fn slots(self) -> u16 {
        match self {
            Category::One => 1,
            Category::Two => 2,
        }
    }
}

/// Kind of a field, array element or descriptor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `L...;` or `[...`
    Reference,
}

impl ValueKind {
    /// Parses the leading character of a field descriptor.
    pub fn from_descriptor_char(c: char) -> Option<Self> {
        Some(match c {
            'Z' => ValueKind::Boolean,
            'B' => ValueKind::Byte,
            'C' => ValueKind::Char,
            'S' => ValueKind::Short,
            'I' => ValueKind::Int,
            'J' => ValueKind::Long,
            'F' => ValueKind::Float,
            'D' => ValueKind::Double,
            'L' | '[' => ValueKind::Reference,
            _ => return None,
        })
    }

    /// Maps a `newarray` type code (4..=11) to its element kind.
    pub fn from_array_type_code(code: u8) -> Option<Self> {
        Some(match code {
            4 => ValueKind::Boolean,
            5 => ValueKind::Char,
            6 => ValueKind::Float,
            7 => ValueKind::Double,
            8 => ValueKind::Byte,
            9 => ValueKind::Short,
            10 => ValueKind::Int,
            11 => ValueKind::Long,
            _ => return None,
        })
    }

    /// Descriptor character for primitive kinds; `L` for references.
    pub fn descriptor_char(self) -> char {
        match self {
            ValueKind::Boolean => 'Z',
            ValueKind::Byte => 'B',
            ValueKind::Char => 'C',
            ValueKind::Short => 'S',
            ValueKind::Int => 'I',
            ValueKind::Long => 'J',
            ValueKind::Float => 'F',
            ValueKind::Double => 'D',
            ValueKind::Reference => 'L',
        }
    }

    /// Accounting weight in bytes.
    pub fn weight(self) -> usize {
        match self {
            ValueKind::Boolean | ValueKind::Byte => 1,
            ValueKind::Char | ValueKind::Short => 2,
            ValueKind::Int | ValueKind::Float | ValueKind::Reference => 4,
            ValueKind::Long | ValueKind::Double => 8,
        }
    }

    /// Verifier category.
    pub fn category(self) -> Category {
        match self {
            ValueKind::Long | ValueKind::Double => Category::Two,
            _ => Category::One,
        }
    }

    /// True for reference kinds.
    pub fn is_reference(self) -> bool {
        self == ValueKind::Reference
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Byte => "byte",
            ValueKind::Char => "char",
            ValueKind::Short => "short",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Reference => "reference",
        };
        write!(f, "{}", name)
    }
}
