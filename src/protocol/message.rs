//! Decoded message representation
//!
//! A parsed message is the message name plus the directive values in
//! template order. The same type carries outbound replies to the codec.

use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// One element of a `%4I` tag/value vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorItem {
    /// Even positions: 4-byte ASCII tag
    Tag(String),
    /// Odd positions: 4-byte signed integer
    Int(i32),
}

/// A single decoded directive value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    /// Raw string payload; clipboard data is not always valid text
    Bytes(Bytes),
    Vector(Vec<VectorItem>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Bytes(_) => "string",
            Value::Vector(_) => "vector",
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Bytes(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Value::Vector(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        VectorItem::Tag(t) => write!(f, "{:?}", t)?,
                        VectorItem::Int(v) => write!(f, "{}", v)?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}

/// Errors reading typed arguments out of a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("{message}: missing argument {index}")]
    Missing { message: &'static str, index: usize },

    #[error("{message}: argument {index} is {found}, expected {expected}")]
    WrongKind {
        message: &'static str,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
}

/// A message with its decoded (or to-be-encoded) arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub name: &'static str,
    pub args: Vec<Value>,
}

impl ParsedMessage {
    pub fn new(name: &'static str, args: Vec<Value>) -> Self {
        Self { name, args }
    }

    /// A message with no arguments
    pub fn bare(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    fn arg(&self, index: usize) -> Result<&Value, ArgumentError> {
        self.args.get(index).ok_or(ArgumentError::Missing {
            message: self.name,
            index,
        })
    }

    fn wrong_kind(&self, index: usize, expected: &'static str, found: &Value) -> ArgumentError {
        ArgumentError::WrongKind {
            message: self.name,
            index,
            expected,
            found: found.kind(),
        }
    }

    /// Integer argument at `index`
    pub fn int(&self, index: usize) -> Result<i32, ArgumentError> {
        match self.arg(index)? {
            Value::Int(v) => Ok(*v),
            other => Err(self.wrong_kind(index, "integer", other)),
        }
    }

    /// String argument at `index`
    pub fn bytes(&self, index: usize) -> Result<&Bytes, ArgumentError> {
        match self.arg(index)? {
            Value::Bytes(b) => Ok(b),
            other => Err(self.wrong_kind(index, "string", other)),
        }
    }

    /// Vector argument at `index`
    pub fn vector(&self, index: usize) -> Result<&[VectorItem], ArgumentError> {
        match self.arg(index)? {
            Value::Vector(items) => Ok(items),
            other => Err(self.wrong_kind(index, "vector", other)),
        }
    }
}

impl fmt::Display for ParsedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}
