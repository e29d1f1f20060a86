//! Controller error types
//!
//! Device absence, open failures, invalid commands and transfer failures
//! are not errors here: they come back as `ConnectionStatus` values. This
//! type covers what a caller cannot recover from by retrying.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    /// The USB subsystem could not be initialized
    #[error("USB initialization failed: {0}")]
    Usb(#[from] rusb::Error),

    /// Internal bookkeeping disagrees with itself (programming error)
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    /// The OS refused to start the control worker thread
    #[error("Failed to spawn control worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The control worker panicked; its device handle is lost
    #[error("Control worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, ControlError>;
