//! USB subsystem
//!
//! The controller consumes USB through two small traits so the connection
//! manager and the control worker can run against real hardware (`rusb`) or
//! a recording mock in tests:
//! - [`UsbTransport`] finds the arm and hands out an opened, claimed device
//! - [`ArmDevice`] performs control transfers and is closed exactly once
//!
//! The control worker runs in a dedicated thread that owns the device for
//! the whole session; callers never touch it while the worker is alive.

pub mod device;
pub mod manager;
pub mod transfers;
pub mod worker;

use crate::config::DeviceSettings;
use std::time::Duration;
use thiserror::Error;

pub use device::RusbDevice;
pub use manager::{RusbTransport, UsbDeviceSummary};
pub use transfers::{TransferError, send_command_word};
pub use worker::spawn_control_worker;

/// Errors while locating and opening the arm
#[derive(Debug, Error)]
pub enum TransportError {
    /// No attached device matches the configured VID:PID
    #[error("Device {vendor_id:04x}:{product_id:04x} not found")]
    NotFound { vendor_id: u16, product_id: u16 },

    /// The device list could not be read
    #[error("Failed to enumerate USB devices: {0}")]
    Enumerate(#[source] rusb::Error),

    /// The device was found but could not be opened
    #[error("Failed to open device: {0}")]
    Open(#[source] rusb::Error),

    /// The device was opened but the interface could not be claimed
    #[error("Failed to claim interface {interface}: {source}")]
    Claim {
        interface: u8,
        #[source]
        source: rusb::Error,
    },
}

/// Source of arm devices
///
/// Implementations enumerate attached devices, pick the first one matching
/// the settings' VID:PID, open it and claim the configured interface. A
/// partially opened handle must be released before an error is returned.
pub trait UsbTransport: Send + Sync {
    type Device: ArmDevice;

    fn open(&self, settings: &DeviceSettings) -> Result<Self::Device, TransportError>;
}

/// An opened arm with its interface claimed
pub trait ArmDevice: Send + 'static {
    /// Issue an OUT control transfer, returning the number of bytes accepted
    ///
    /// A zero `timeout` waits forever.
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    /// Release the claimed interface and close the handle
    fn close(self);
}
