//! Protocol codec for decoding frames into messages and formatting replies
//!
//! Decoding selects a definition by the frame's 4-byte identifier and then
//! walks the compiled template over the whole frame. Formatting is the same
//! walk in reverse.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::sync::Arc;
use thiserror::Error;

use super::message::{ParsedMessage, Value, VectorItem};
use super::registry::{MessageDef, Registry};
use super::template::{Directive, IntWidth, Token, IDENTIFIER_LEN};

/// Decode errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Frame too short to carry an identifier: {len} bytes")]
    TooShort { len: usize },

    #[error("Unknown message identifier {:?}", String::from_utf8_lossy(.identifier))]
    UnknownIdentifier { identifier: [u8; IDENTIFIER_LEN] },

    #[error("{message}: expected byte {expected:#04x} at offset {offset}, found {found:#04x}")]
    LiteralMismatch {
        message: &'static str,
        offset: usize,
        expected: u8,
        found: u8,
    },

    #[error("{message}: needed {needed} bytes at offset {offset}, only {available} left")]
    Truncated {
        message: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("{message}: negative length {length} at offset {offset}")]
    NegativeLength {
        message: &'static str,
        offset: usize,
        length: i32,
    },

    #[error("{message}: non-ASCII vector tag at offset {offset}")]
    InvalidTag { message: &'static str, offset: usize },

    #[error("{message}: {count} unconsumed trailing bytes")]
    TrailingBytes { message: &'static str, count: usize },
}

/// Encode errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    #[error("{message}: argument {index} value {value} does not fit in {width} bytes")]
    OutOfRange {
        message: &'static str,
        index: usize,
        value: i32,
        width: usize,
    },

    #[error("{message}: argument {index} is {found}, expected {expected}")]
    TypeMismatch {
        message: &'static str,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{message}: missing argument {index}")]
    MissingArgument { message: &'static str, index: usize },

    #[error("{message}: {given} arguments given, template takes {expected}")]
    ExtraArguments {
        message: &'static str,
        expected: usize,
        given: usize,
    },

    #[error("{message}: string argument {index} is too long ({len} bytes)")]
    StringTooLong {
        message: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{message}: tag/value vectors cannot be encoded")]
    VectorUnsupported { message: &'static str },
}

/// Read cursor over one frame that reports offsets relative to its start
struct Reader<'a> {
    message: &'static str,
    len: usize,
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(message: &'static str, frame: &'a [u8]) -> Self {
        Self {
            message,
            len: frame.len(),
            buf: frame,
        }
    }

    fn offset(&self) -> usize {
        self.len - self.buf.remaining()
    }

    fn need(&self, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::Truncated {
                message: self.message,
                offset: self.offset(),
                needed,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn literal(&mut self, expected: &[u8]) -> Result<(), DecodeError> {
        for &byte in expected {
            self.need(1)?;
            let offset = self.offset();
            let found = self.buf.get_u8();
            if found != byte {
                return Err(DecodeError::LiteralMismatch {
                    message: self.message,
                    offset,
                    expected: byte,
                    found,
                });
            }
        }
        Ok(())
    }

    fn int(&mut self, width: IntWidth) -> Result<i32, DecodeError> {
        self.need(width.bytes())?;
        Ok(match width {
            IntWidth::One => i32::from(self.buf.get_i8()),
            IntWidth::Two => i32::from(self.buf.get_i16()),
            IntWidth::Four => self.buf.get_i32(),
        })
    }

    /// A 4-byte length or count, rejected when negative
    fn length(&mut self) -> Result<usize, DecodeError> {
        let offset = self.offset();
        let length = self.int(IntWidth::Four)?;
        usize::try_from(length).map_err(|_| DecodeError::NegativeLength {
            message: self.message,
            offset,
            length,
        })
    }

    fn string(&mut self) -> Result<Bytes, DecodeError> {
        let len = self.length()?;
        self.need(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    fn vector(&mut self) -> Result<Vec<VectorItem>, DecodeError> {
        let count = self.length()?;
        let mut items = Vec::with_capacity(count.min(self.buf.remaining() / 4));
        for i in 0..count {
            if i % 2 == 0 {
                self.need(4)?;
                let offset = self.offset();
                let tag = &self.buf[..4];
                if !tag.is_ascii() {
                    return Err(DecodeError::InvalidTag {
                        message: self.message,
                        offset,
                    });
                }
                items.push(VectorItem::Tag(String::from_utf8_lossy(tag).into_owned()));
                self.buf.advance(4);
            } else {
                items.push(VectorItem::Int(self.int(IntWidth::Four)?));
            }
        }
        Ok(items)
    }

    fn finish(&self) -> Result<(), DecodeError> {
        match self.buf.remaining() {
            0 => Ok(()),
            count => Err(DecodeError::TrailingBytes {
                message: self.message,
                count,
            }),
        }
    }
}

/// Decode a frame against one specific definition.
///
/// The whole frame, identifier included, must match the template exactly.
pub fn decode(def: &MessageDef, frame: &[u8]) -> Result<ParsedMessage, DecodeError> {
    let mut reader = Reader::new(def.name, frame);
    let mut args = Vec::new();

    for token in def.template.tokens() {
        match token {
            Token::Literal(bytes) => reader.literal(bytes)?,
            Token::Directive(Directive::Int(width)) => args.push(Value::Int(reader.int(*width)?)),
            Token::Directive(Directive::Str) => args.push(Value::Bytes(reader.string()?)),
            Token::Directive(Directive::Vector) => args.push(Value::Vector(reader.vector()?)),
        }
    }
    reader.finish()?;

    Ok(ParsedMessage::new(def.name, args))
}

/// Format arguments against one specific definition
pub fn encode(def: &MessageDef, args: &[Value]) -> Result<Bytes, EncodeError> {
    let message = def.name;
    let mut buf = BytesMut::with_capacity(def.template.source().len() + 16);
    let mut index = 0;

    for token in def.template.tokens() {
        let directive = match token {
            Token::Literal(bytes) => {
                buf.put_slice(bytes);
                continue;
            }
            Token::Directive(d) => *d,
        };

        if directive == Directive::Vector {
            return Err(EncodeError::VectorUnsupported { message });
        }

        let value = args
            .get(index)
            .ok_or(EncodeError::MissingArgument { message, index })?;

        match (directive, value) {
            (Directive::Int(width), Value::Int(v)) => {
                if !width.fits(*v) {
                    return Err(EncodeError::OutOfRange {
                        message,
                        index,
                        value: *v,
                        width: width.bytes(),
                    });
                }
                match width {
                    IntWidth::One => buf.put_i8(*v as i8),
                    IntWidth::Two => buf.put_i16(*v as i16),
                    IntWidth::Four => buf.put_i32(*v),
                }
            }
            (Directive::Str, Value::Bytes(b)) => {
                let len = i32::try_from(b.len()).map_err(|_| EncodeError::StringTooLong {
                    message,
                    index,
                    len: b.len(),
                })?;
                buf.put_i32(len);
                buf.put_slice(b);
            }
            (directive, other) => {
                return Err(EncodeError::TypeMismatch {
                    message,
                    index,
                    expected: match directive {
                        Directive::Int(_) => "integer",
                        _ => "string",
                    },
                    found: other.kind(),
                })
            }
        }
        index += 1;
    }

    if index != args.len() {
        return Err(EncodeError::ExtraArguments {
            message,
            expected: index,
            given: args.len(),
        });
    }

    Ok(buf.freeze())
}

/// Registry-backed codec
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<Registry>,
}

impl Codec {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Identify and decode an incoming frame
    pub fn parse(&self, frame: &[u8]) -> Result<ParsedMessage, DecodeError> {
        if frame.len() < IDENTIFIER_LEN {
            return Err(DecodeError::TooShort { len: frame.len() });
        }
        let mut identifier = [0u8; IDENTIFIER_LEN];
        identifier.copy_from_slice(&frame[..IDENTIFIER_LEN]);

        let def = self
            .registry
            .identify(&identifier)
            .ok_or(DecodeError::UnknownIdentifier { identifier })?;

        decode(def, frame)
    }

    /// Format a message by name
    pub fn format(&self, message: &ParsedMessage) -> Result<Bytes, EncodeError> {
        let def = self
            .registry
            .get(message.name)
            .ok_or_else(|| EncodeError::UnknownMessage(message.name.to_string()))?;
        encode(def, &message.args)
    }
}
