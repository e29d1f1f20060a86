//! USB device discovery
//!
//! Owns the libusb context and locates the arm among the attached devices.
//! Creating the context is the only fatal USB failure: everything after that
//! is reported through connection status values.

use crate::config::DeviceSettings;
use crate::usb::device::RusbDevice;
use crate::usb::{TransportError, UsbTransport};
use rusb::{Context, UsbContext};
use tracing::{debug, info, warn};

/// Summary of an attached USB device, for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceSummary {
    pub bus_number: u8,
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl UsbDeviceSummary {
    /// Whether this device matches the arm settings
    pub fn matches(&self, settings: &DeviceSettings) -> bool {
        self.vendor_id == settings.vendor_id && self.product_id == settings.product_id
    }
}

/// `rusb`-backed transport
pub struct RusbTransport {
    /// USB context for device operations
    context: Context,
}

impl RusbTransport {
    /// Initialize libusb
    pub fn new() -> Result<Self, rusb::Error> {
        let context = Context::new()?;
        debug!("USB context initialized");
        Ok(Self { context })
    }

    /// List every attached device whose descriptor can be read
    pub fn list_devices(&self) -> Result<Vec<UsbDeviceSummary>, rusb::Error> {
        let devices = self.context.devices()?;

        let summaries: Vec<UsbDeviceSummary> = devices
            .iter()
            .filter_map(|device| match device.device_descriptor() {
                Ok(desc) => Some(UsbDeviceSummary {
                    bus_number: device.bus_number(),
                    address: device.address(),
                    vendor_id: desc.vendor_id(),
                    product_id: desc.product_id(),
                }),
                Err(e) => {
                    debug!(
                        "Skipping device bus={} addr={}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    None
                }
            })
            .collect();

        debug!("Enumerated {} devices", summaries.len());
        Ok(summaries)
    }
}

impl UsbTransport for RusbTransport {
    type Device = RusbDevice;

    fn open(&self, settings: &DeviceSettings) -> Result<RusbDevice, TransportError> {
        let devices = self.context.devices().map_err(|e| {
            warn!("Failed to enumerate USB devices: {}", e);
            TransportError::Enumerate(e)
        })?;

        let found = devices.iter().find(|device| {
            device
                .device_descriptor()
                .map(|desc| {
                    desc.vendor_id() == settings.vendor_id
                        && desc.product_id() == settings.product_id
                })
                .unwrap_or(false)
        });

        let Some(device) = found else {
            return Err(TransportError::NotFound {
                vendor_id: settings.vendor_id,
                product_id: settings.product_id,
            });
        };

        info!(
            "Found arm {:04x}:{:04x} on bus {:03} address {:03}",
            settings.vendor_id,
            settings.product_id,
            device.bus_number(),
            device.address()
        );

        RusbDevice::open(&device, settings.interface)
    }
}
