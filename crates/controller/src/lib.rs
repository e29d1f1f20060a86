//! Host-side controller for the Velleman KSR10 / OWI-535 USB robotic arm
//!
//! [`RoboticArm`] connects to the arm over USB and keeps its actuators in the
//! state most recently requested. A dedicated control worker thread owns the
//! device for the duration of a connection and re-asserts the command word
//! whenever it changes, so callers never block on USB I/O except while
//! connecting and disconnecting.

pub mod arm;
pub mod config;
pub mod error;
pub mod state;
pub mod test_utils;
pub mod usb;

pub use arm::RoboticArm;
pub use config::{ArmConfig, DeviceSettings};
pub use error::{ControlError, Result};
pub use usb::{ArmDevice, RusbTransport, TransportError, UsbTransport};
