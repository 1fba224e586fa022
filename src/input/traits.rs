//! Input trait definitions
//!
//! OS-level injection lives outside this crate; handlers only see this seam.

use thiserror::Error;

use super::events::InputEvent;

/// Errors that can occur during input operations
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Not supported on this platform")]
    NotSupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type InputResult<T> = Result<T, InputError>;

/// Sink that performs the injection of decoded input events
pub trait InputSink: Send {
    /// Inject one event into the local system
    fn inject(&mut self, event: InputEvent) -> InputResult<()>;
}

/// Sink that only traces events, for running without an injection backend
#[derive(Debug, Default)]
pub struct LoggingInputSink {
    injected: u64,
}

impl LoggingInputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events seen so far
    pub fn injected(&self) -> u64 {
        self.injected
    }
}

impl InputSink for LoggingInputSink {
    fn inject(&mut self, event: InputEvent) -> InputResult<()> {
        self.injected += 1;
        match &event {
            InputEvent::MouseMove { .. } => tracing::trace!("inject {:?}", event),
            _ => tracing::debug!("inject {:?}", event),
        }
        Ok(())
    }
}
