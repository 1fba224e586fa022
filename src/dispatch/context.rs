//! Handler context
//!
//! Everything a handler may touch is passed in explicitly: the input sink,
//! the display geometry source and the per-connection state.

use std::collections::BTreeMap;
use std::fmt;

use crate::input::InputSink;
use crate::protocol::{PROTOCOL_MAJOR, PROTOCOL_MINOR};
use crate::screen::DisplayGeometry;

/// A protocol version pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: i32,
    pub minor: i32,
}

impl ProtocolVersion {
    pub const fn new(major: i32, minor: i32) -> Self {
        Self { major, minor }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::new(PROTOCOL_MAJOR, PROTOCOL_MINOR)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Per-connection state carried between messages
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Screen name announced in the handshake reply
    pub client_name: String,
    /// Version announced in the handshake reply
    pub version: ProtocolVersion,
    /// Version the primary announced in its hello
    pub server_version: Option<ProtocolVersion>,
    /// Sequence number from the most recent enter
    pub enter_sequence: i32,
    /// Whether the cursor is currently on this screen
    pub on_screen: bool,
    /// Last absolute cursor position sent by the primary
    pub cursor: Option<(i32, i32)>,
    /// Options set by the primary, keyed by 4-character option name
    pub options: BTreeMap<String, i32>,
}

impl SessionState {
    pub fn new(client_name: impl Into<String>, version: ProtocolVersion) -> Self {
        Self {
            client_name: client_name.into(),
            version,
            server_version: None,
            enter_sequence: 0,
            on_screen: false,
            cursor: None,
            options: BTreeMap::new(),
        }
    }

    pub fn option(&self, name: &str) -> Option<i32> {
        self.options.get(name).copied()
    }
}

/// Collaborators and state lent to a handler for one message
pub struct HandlerContext<'a> {
    pub input: &'a mut dyn InputSink,
    pub display: &'a dyn DisplayGeometry,
    pub state: &'a mut SessionState,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        input: &'a mut dyn InputSink,
        display: &'a dyn DisplayGeometry,
        state: &'a mut SessionState,
    ) -> Self {
        Self {
            input,
            display,
            state,
        }
    }
}
