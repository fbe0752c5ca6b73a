//! # Event
//!
//! Everything the interactive driver may be woken up by

use super::types::Response;

/// Event delivered to the driver through the session event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A line typed by the user, without its terminator
    Input(String),
    /// The input reached its end or failed
    InputClosed,
    /// A keep-alive probe was answered
    KeepAlive(Response),
    /// A keep-alive probe failed, but the connection is still usable
    KeepAliveFailed(String),
    /// The control connection is gone; the session must end
    ConnectionLost(String),
}
