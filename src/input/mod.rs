//! Input module - the injection seam used by message handlers
//!
//! This module provides:
//! - Platform-independent key and mouse event types
//! - The `InputSink` trait that OS-specific injectors implement
//! - A tracing-only sink and a recording sink for tests

mod events;
mod mock;
mod traits;

pub use events::*;
pub use mock::RecordingInputSink;
pub use traits::*;
