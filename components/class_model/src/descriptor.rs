//! Field and method descriptors
//!
//! Parses the class-file type grammar: `I`, `[J`, `Ljava/lang/String;` for
//! fields and `(IJ[Ljava/lang/Object;)V` for methods.

use std::fmt;

use core_types::{Category, ValueKind};
use thiserror::Error;

/// A malformed descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The descriptor was empty or ended early
    #[error("descriptor `{0}` ends unexpectedly")]
    Truncated(String),
    /// A character that does not start a type
    #[error("descriptor `{descriptor}` has unexpected `{found}` at {position}")]
    Unexpected {
        /// Full descriptor
        descriptor: String,
        /// Offending character
        found: char,
        /// Character index
        position: usize,
    },
    /// Characters after a complete descriptor
    #[error("descriptor `{0}` has trailing characters")]
    Trailing(String),
}

/// A field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A primitive
    Primitive(ValueKind),
    /// An object type, by internal class name (`java/lang/String`)
    Object(String),
    /// An array of the component type
    Array(Box<FieldType>),
}

impl FieldType {
    /// Parses a complete field descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let mut parser = Parser::new(descriptor);
        let ty = parser.field_type()?;
        parser.finish()?;
        Ok(ty)
    }

    /// Storage kind of a value of this type.
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldType::Primitive(kind) => *kind,
            FieldType::Object(_) | FieldType::Array(_) => ValueKind::Reference,
        }
    }

    /// Stack category.
    pub fn category(&self) -> Category {
        self.kind().category()
    }

    /// Class name for reference types as used by the class table: the
    /// internal name for objects, the full descriptor for arrays.
    pub fn class_name(&self) -> Option<String> {
        match self {
            FieldType::Primitive(_) => None,
            FieldType::Object(name) => Some(name.clone()),
            FieldType::Array(_) => Some(self.to_string()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(kind) => write!(f, "{}", kind.descriptor_char()),
            FieldType::Object(name) => write!(f, "L{};", name),
            FieldType::Array(component) => write!(f, "[{}", component),
        }
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Parameter types in order
    pub params: Vec<FieldType>,
    /// Return type, `None` for `void`
    pub returns: Option<FieldType>,
}

impl MethodDescriptor {
    /// Parses a complete method descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let mut parser = Parser::new(descriptor);
        parser.expect('(')?;
        let mut params = Vec::new();
        while parser.peek() != Some(')') {
            params.push(parser.field_type()?);
        }
        parser.expect(')')?;
        let returns = if parser.peek() == Some('V') {
            parser.bump();
            None
        } else {
            Some(parser.field_type()?)
        };
        parser.finish()?;
        Ok(Self { params, returns })
    }

    /// Local variable slots taken by the parameters (longs and doubles take two).
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(|p| p.category().slots()).sum()
    }

    /// Stack category of each parameter.
    pub fn param_categories(&self) -> Vec<Category> {
        self.params.iter().map(FieldType::category).collect()
    }

    /// Stack category of the return value.
    pub fn return_category(&self) -> Option<Category> {
        self.returns.as_ref().map(FieldType::category)
    }
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn truncated(&self) -> DescriptorError {
        DescriptorError::Truncated(self.text.to_string())
    }

    fn unexpected(&self, found: char) -> DescriptorError {
        DescriptorError::Unexpected {
            descriptor: self.text.to_string(),
            found,
            position: self.pos.saturating_sub(1),
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), DescriptorError> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(self.unexpected(c)),
            None => Err(self.truncated()),
        }
    }

    fn field_type(&mut self) -> Result<FieldType, DescriptorError> {
        let c = self.bump().ok_or_else(|| self.truncated())?;
        match c {
            'L' => {
                let start = self.pos;
                while let Some(c) = self.bump() {
                    if c == ';' {
                        let name: String = self.chars[start..self.pos - 1].iter().collect();
                        if name.is_empty() {
                            return Err(self.unexpected(';'));
                        }
                        return Ok(FieldType::Object(name));
                    }
                }
                Err(self.truncated())
            }
            '[' => Ok(FieldType::Array(Box::new(self.field_type()?))),
            other => match ValueKind::from_descriptor_char(other) {
                Some(kind) if !kind.is_reference() => Ok(FieldType::Primitive(kind)),
                _ => Err(self.unexpected(other)),
            },
        }
    }

    fn finish(&self) -> Result<(), DescriptorError> {
        if self.pos == self.chars.len() {
            Ok(())
        } else {
            Err(DescriptorError::Trailing(self.text.to_string()))
        }
    }
}
