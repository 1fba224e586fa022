//! Message layout templates
//!
//! A template is a printf-like description of a message body: literal ASCII
//! bytes interleaved with `%` directives.
//! - `%1i`, `%2i`, `%4i`: big-endian signed integer of 1, 2 or 4 bytes
//! - `%s`: 4-byte big-endian length followed by that many raw bytes
//! - `%4I`: 4-byte element count followed by alternating 4-byte ASCII tags
//!   and 4-byte signed integers
//!
//! Templates are compiled once into a token list so the decode path never
//! rescans the template text.

use std::fmt;
use thiserror::Error;

/// Number of leading literal bytes that identify a message
pub const IDENTIFIER_LEN: usize = 4;

/// Template compilation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template {template:?}: unsupported directive '%{kind}'")]
    UnsupportedDirective { template: String, kind: char },

    #[error("Template {template:?}: invalid width {width} for '%{kind}'")]
    InvalidWidth {
        template: String,
        kind: char,
        width: usize,
    },

    #[error("Template {template:?}: directive truncated at end of template")]
    TruncatedDirective { template: String },

    #[error("Template {template:?}: literal text must be ASCII")]
    NonAscii { template: String },

    #[error("Template {template:?}: needs {IDENTIFIER_LEN} leading literal bytes as identifier")]
    MissingIdentifier { template: String },
}

/// Width of an integer directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    One,
    Two,
    Four,
}

impl IntWidth {
    fn from_digits(width: usize) -> Option<Self> {
        match width {
            1 => Some(IntWidth::One),
            2 => Some(IntWidth::Two),
            4 => Some(IntWidth::Four),
            _ => None,
        }
    }

    /// Number of bytes on the wire
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::One => 1,
            IntWidth::Two => 2,
            IntWidth::Four => 4,
        }
    }

    /// Whether `value` is representable in this width
    pub fn fits(self, value: i32) -> bool {
        match self {
            IntWidth::One => i8::try_from(value).is_ok(),
            IntWidth::Two => i16::try_from(value).is_ok(),
            IntWidth::Four => true,
        }
    }
}

/// A typed placeholder within a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Int(IntWidth),
    Str,
    Vector,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Int(w) => write!(f, "%{}i", w.bytes()),
            Directive::Str => f.write_str("%s"),
            Directive::Vector => f.write_str("%4I"),
        }
    }
}

/// One step of a compiled template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Run of bytes that must appear verbatim
    Literal(Vec<u8>),
    Directive(Directive),
}

/// A compiled message layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: &'static str,
    tokens: Vec<Token>,
}

impl Template {
    /// Compile a template string
    pub fn compile(source: &'static str) -> Result<Self, TemplateError> {
        if !source.is_ascii() {
            return Err(TemplateError::NonAscii {
                template: source.to_string(),
            });
        }

        let bytes = source.as_bytes();
        let mut tokens = Vec::new();
        let mut literal = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            if bytes[pos] != b'%' {
                literal.push(bytes[pos]);
                pos += 1;
                continue;
            }
            pos += 1;

            let mut width = 0usize;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                width = width * 10 + usize::from(bytes[pos] - b'0');
                pos += 1;
            }

            let kind = match bytes.get(pos) {
                Some(&k) => k as char,
                None => {
                    return Err(TemplateError::TruncatedDirective {
                        template: source.to_string(),
                    })
                }
            };
            pos += 1;

            let invalid_width = || TemplateError::InvalidWidth {
                template: source.to_string(),
                kind,
                width,
            };
            let directive = match kind {
                'i' => Directive::Int(IntWidth::from_digits(width).ok_or_else(invalid_width)?),
                's' if width == 0 => Directive::Str,
                'I' if width == 4 => Directive::Vector,
                's' | 'I' => return Err(invalid_width()),
                other => {
                    return Err(TemplateError::UnsupportedDirective {
                        template: source.to_string(),
                        kind: other,
                    })
                }
            };

            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::Directive(directive));
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        let template = Self { source, tokens };
        if template.identifier().is_none() {
            return Err(TemplateError::MissingIdentifier {
                template: source.to_string(),
            });
        }
        Ok(template)
    }

    /// The template text this was compiled from
    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The leading literal bytes that identify the message on the wire
    pub fn identifier(&self) -> Option<[u8; IDENTIFIER_LEN]> {
        match self.tokens.first() {
            Some(Token::Literal(lit)) if lit.len() >= IDENTIFIER_LEN => {
                let mut id = [0u8; IDENTIFIER_LEN];
                id.copy_from_slice(&lit[..IDENTIFIER_LEN]);
                Some(id)
            }
            _ => None,
        }
    }

    /// Directives in template order
    pub fn directives(&self) -> impl Iterator<Item = Directive> + '_ {
        self.tokens.iter().filter_map(|t| match t {
            Token::Directive(d) => Some(*d),
            Token::Literal(_) => None,
        })
    }
}
