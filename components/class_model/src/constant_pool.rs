//! Constant pool
//!
//! The class source delivers constants already symbolic: class references
//! carry the class name, member references carry class, name and descriptor.
//! Indices are 1-based and `long`/`double` entries occupy two indices, as in
//! the class-file format, so raw bytecode operands index the pool directly.
//!
//! The pool is append-only and safe to grow from several threads.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A class, name and descriptor triple naming a field or method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    /// Internal name of the class the reference is made through
    pub class: Arc<str>,
    /// Member name
    pub name: Arc<str>,
    /// Member descriptor
    pub descriptor: Arc<str>,
}

impl MemberRef {
    /// Creates a member reference.
    pub fn new(class: &str, name: &str, descriptor: &str) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl std::fmt::Display for MemberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}:{}", self.class, self.name, self.descriptor)
    }
}

/// One constant pool entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// Second slot of a `Long` or `Double`, or the unused index 0
    Unusable,
    /// Raw text
    Utf8(Arc<str>),
    /// `int` literal
    Integer(i32),
    /// `float` literal
    Float(f32),
    /// `long` literal (two slots)
    Long(i64),
    /// `double` literal (two slots)
    Double(f64),
    /// Class reference by internal name (or array descriptor)
    Class(Arc<str>),
    /// String literal
    String(Arc<str>),
    /// Field reference
    FieldRef(MemberRef),
    /// Class method reference
    MethodRef(MemberRef),
    /// Interface method reference
    InterfaceMethodRef(MemberRef),
}

impl Constant {
    /// True for entries that take two pool indices.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    /// Short name of the entry kind, for diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Constant::Unusable => "unusable",
            Constant::Utf8(_) => "utf8",
            Constant::Integer(_) => "integer",
            Constant::Float(_) => "float",
            Constant::Long(_) => "long",
            Constant::Double(_) => "double",
            Constant::Class(_) => "class",
            Constant::String(_) => "string",
            Constant::FieldRef(_) => "fieldref",
            Constant::MethodRef(_) => "methodref",
            Constant::InterfaceMethodRef(_) => "interface methodref",
        }
    }
}

/// Thread-safe, append-only constant pool.
///
/// # Examples
///
/// ```
/// use class_model::{Constant, ConstantPool};
///
/// let pool = ConstantPool::new();
/// let long = pool.push(Constant::Long(7));
/// let text = pool.push(Constant::String("hi".into()));
/// assert_eq!((long, text), (1, 3));
/// assert_eq!(pool.get(2), Some(Constant::Unusable));
/// ```
#[derive(Debug)]
pub struct ConstantPool {
    entries: RwLock<Vec<Constant>>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    /// Creates a pool holding only the unused index 0.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(vec![Constant::Unusable]),
        }
    }

    /// Creates a pool from entries that start at index 1. Wide entries get
    /// their second slot inserted automatically.
    pub fn from_entries(constants: impl IntoIterator<Item = Constant>) -> Self {
        let pool = Self::new();
        for constant in constants {
            pool.push(constant);
        }
        pool
    }

    /// Appends an entry and returns its index.
    pub fn push(&self, constant: Constant) -> u16 {
        let mut entries = self.entries.write();
        let index = entries.len() as u16;
        let wide = constant.is_wide();
        entries.push(constant);
        if wide {
            entries.push(Constant::Unusable);
        }
        index
    }

    /// Returns the index of an equal entry, appending one if absent.
    pub fn intern(&self, constant: Constant) -> u16 {
        {
            let entries = self.entries.read();
            if let Some(index) = entries.iter().skip(1).position(|c| *c == constant) {
                return index as u16 + 1;
            }
        }
        self.push(constant)
    }

    /// Entry at `index`.
    pub fn get(&self, index: u16) -> Option<Constant> {
        self.entries.read().get(index as usize).cloned()
    }

    /// Number of indices in use, including index 0.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when only the unused index 0 exists.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// All entries from index 1, skipping second slots of wide entries.
    pub fn entries(&self) -> Vec<Constant> {
        self.entries
            .read()
            .iter()
            .skip(1)
            .filter(|c| !matches!(c, Constant::Unusable))
            .cloned()
            .collect()
    }
}
