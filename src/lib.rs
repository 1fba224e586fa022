//! synclient - Synergy secondary-screen client
//!
//! Speaks the Synergy v1.6 wire protocol to a primary: frames arrive over
//! TCP, are decoded against the message registry, and are dispatched to
//! handlers that drive an input sink and answer screen queries.

pub mod config;
pub mod dispatch;
pub mod input;
pub mod network;
pub mod protocol;
pub mod screen;
