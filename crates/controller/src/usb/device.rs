//! USB device abstraction
//!
//! This module provides a wrapper around an opened `rusb::DeviceHandle` with
//! the arm's interface claimed.

use crate::usb::{ArmDevice, TransportError};
use rusb::{Context, Device, DeviceHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Opened arm device
///
/// Owns the handle and remembers whether a kernel driver had to be detached
/// so it can be reattached on close.
pub struct RusbDevice {
    /// Device handle
    handle: DeviceHandle<Context>,
    /// Claimed interface
    interface: u8,
    /// Whether we detached a kernel driver from the interface
    detached_kernel_driver: bool,
    /// Bus number, for log messages
    bus_number: u8,
    /// Device address, for log messages
    address: u8,
}

impl RusbDevice {
    /// Open a device and claim one interface
    ///
    /// Detaches an active kernel driver first where the platform supports
    /// it. On a claim failure the handle is closed before returning.
    pub fn open(device: &Device<Context>, interface: u8) -> Result<Self, TransportError> {
        let handle = device.open().map_err(|e| {
            warn!("Failed to open device: {}", e);
            TransportError::Open(e)
        })?;

        let bus_number = device.bus_number();
        let address = device.address();
        debug!("Opened device on bus {:03} address {:03}", bus_number, address);

        let mut detached_kernel_driver = false;
        match handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!("Detaching kernel driver from interface {}", interface);
                match handle.detach_kernel_driver(interface) {
                    Ok(()) => detached_kernel_driver = true,
                    Err(e) => {
                        // Claiming will most likely fail next; let it report the error
                        warn!(
                            "Failed to detach kernel driver from interface {}: {}",
                            interface, e
                        );
                    }
                }
            }
            Ok(false) => {
                debug!("No kernel driver active on interface {}", interface);
            }
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
            }
        }

        let mut rusb_device = Self {
            handle,
            interface,
            detached_kernel_driver,
            bus_number,
            address,
        };

        if let Err(e) = rusb_device.handle.claim_interface(interface) {
            warn!("Failed to claim interface {}: {}", interface, e);
            rusb_device.reattach_kernel_driver();
            return Err(TransportError::Claim {
                interface,
                source: e,
            });
        }

        debug!("Claimed interface {}", interface);
        Ok(rusb_device)
    }

    fn reattach_kernel_driver(&mut self) {
        if !self.detached_kernel_driver {
            return;
        }
        if let Err(e) = self.handle.attach_kernel_driver(self.interface) {
            debug!(
                "Could not reattach kernel driver to interface {}: {}",
                self.interface, e
            );
        } else {
            debug!("Reattached kernel driver to interface {}", self.interface);
        }
        self.detached_kernel_driver = false;
    }
}

impl ArmDevice for RusbDevice {
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        self.handle
            .write_control(request_type, request, value, index, data, timeout)
    }

    fn close(mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            warn!("Failed to release interface {}: {}", self.interface, e);
        }
        self.reattach_kernel_driver();
        debug!(
            "Closed device on bus {:03} address {:03}",
            self.bus_number, self.address
        );
        // Dropping the handle closes it
    }
}
