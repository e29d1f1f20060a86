//! Protocol error types

use crate::types::{Action, Actuator};
use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The actuator does not accept this action (e.g. opening the light)
    #[error("Invalid command: {actuator} does not accept action {action:?}")]
    InvalidCommand { actuator: Actuator, action: Action },

    /// Unknown actuator name
    #[error("Unknown actuator '{0}'")]
    UnknownActuator(String),

    /// Unknown action name
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    /// Command text not in `actuator=action` form
    #[error("Malformed command '{0}', expected ACTUATOR=ACTION (e.g. 'gripper=close')")]
    MalformedCommand(String),

    /// Wire payload has the wrong length
    #[error("Invalid payload length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
