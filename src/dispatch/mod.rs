//! Dispatch module - routes parsed messages to handlers
//!
//! Provides:
//! - The handler table, keyed by a name-derived handler key
//! - The dispatcher and its outcomes
//! - The standard handler set for a secondary screen

mod context;
mod handlers;
mod table;

pub use context::*;
pub use handlers::standard_handlers;
pub use table::*;

use std::fmt;
use thiserror::Error;

use crate::input::InputError;
use crate::protocol::{ArgumentError, ParsedMessage};
use crate::screen::DisplayError;

/// Why the primary ended the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// Close-connection message
    Closed,
    IncompatibleVersion(ProtocolVersion),
    NameInUse,
    UnknownClient,
    ProtocolViolation,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Closed => f.write_str("server closed the connection"),
            TerminationReason::IncompatibleVersion(v) => {
                write!(f, "incompatible protocol version (server speaks {})", v)
            }
            TerminationReason::NameInUse => f.write_str("screen name already in use"),
            TerminationReason::UnknownClient => {
                f.write_str("screen name not in the server configuration")
            }
            TerminationReason::ProtocolViolation => f.write_str("protocol violation"),
        }
    }
}

/// What a handler asks the session to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Side effects only
    Done,
    /// Send one message back to the primary
    Reply(ParsedMessage),
    /// Close the connection
    Terminate(TerminationReason),
}

/// Errors raised inside a handler
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Bad argument: {0}")]
    Argument(#[from] ArgumentError),

    #[error("Input injection failed: {0}")]
    Input(#[from] InputError),

    #[error("Display query failed: {0}")]
    Display(#[from] DisplayError),
}

pub type HandlerResult = Result<Outcome, HandlerError>;

/// Dispatch errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No handler '{key}' for message {name}")]
    Unhandled { name: &'static str, key: String },

    #[error("Error handling {message}: {source}")]
    HandlerFailed {
        message: ParsedMessage,
        #[source]
        source: HandlerError,
    },
}
