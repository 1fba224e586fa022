//! Recording input sink for tests
//!
//! Events are pushed into a shared list so a test can keep a handle to the
//! list after the sink has been moved into a session.

use std::sync::{Arc, Mutex};

use super::events::InputEvent;
use super::traits::{InputError, InputResult, InputSink};

/// A sink that records every event instead of injecting it
#[derive(Debug, Default, Clone)]
pub struct RecordingInputSink {
    events: Arc<Mutex<Vec<InputEvent>>>,
    /// When `true`, every call fails with `InputError::Platform`
    pub should_fail: bool,
}

impl RecordingInputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl InputSink for RecordingInputSink {
    fn inject(&mut self, event: InputEvent) -> InputResult<()> {
        if self.should_fail {
            return Err(InputError::Platform("mock failure".into()));
        }
        self.events
            .lock()
            .map_err(|_| InputError::Platform("event log poisoned".into()))?
            .push(event);
        Ok(())
    }
}
