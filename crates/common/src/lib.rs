//! Common utilities for robotic-arm-usb
//!
//! This crate provides the ambient pieces shared by the controller library
//! and its command line front-end: the common error type and tracing setup.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::{VALID_LOG_LEVELS, setup_logging};
