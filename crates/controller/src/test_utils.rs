//! Test utilities for the arm controller
//!
//! [`MockTransport`] stands in for libusb. It hands out [`MockDevice`]s that
//! record every control transfer and can be told to fail opens, claims or
//! individual transfers. All clones of a transport share one recorder.
//!
//! # Example
//!
//! ```
//! use controller::RoboticArm;
//! use controller::config::DeviceSettings;
//! use controller::test_utils::{DEFAULT_TEST_TIMEOUT, MockTransport};
//! use protocol::{Action, Actuator, ConnectionStatus};
//!
//! let mock = MockTransport::new();
//! let arm = RoboticArm::new(mock.clone(), DeviceSettings::default());
//!
//! assert_eq!(arm.connect().unwrap(), ConnectionStatus::Connected);
//! arm.send_command(Actuator::Light, Action::ON);
//! assert!(mock.wait_for_transfers(2, DEFAULT_TEST_TIMEOUT));
//! ```

use crate::config::DeviceSettings;
use crate::usb::{ArmDevice, TransportError, UsbTransport};
use protocol::{CommandWord, decode_command_word};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One control transfer as seen by a [`MockDevice`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub data: Vec<u8>,
    pub timeout: Duration,
}

impl RecordedTransfer {
    /// Command word carried by the payload, if it is well formed
    pub fn word(&self) -> Option<CommandWord> {
        decode_command_word(&self.data).ok()
    }
}

#[derive(Debug)]
struct MockInner {
    present: bool,
    open_error: Option<rusb::Error>,
    claim_error: Option<rusb::Error>,
    failing_transfers: usize,
    short_write: Option<usize>,
    hold: bool,
    opens: usize,
    closes: usize,
    transfers: Vec<RecordedTransfer>,
    last_settings: Option<DeviceSettings>,
}

impl Default for MockInner {
    fn default() -> Self {
        Self {
            present: true,
            open_error: None,
            claim_error: None,
            failing_transfers: 0,
            short_write: None,
            hold: false,
            opens: 0,
            closes: 0,
            transfers: Vec::new(),
            last_settings: None,
        }
    }
}

#[derive(Debug, Default)]
struct MockShared {
    inner: Mutex<MockInner>,
    changed: Condvar,
}

impl MockShared {
    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Recording stand-in for [`crate::usb::RusbTransport`]
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    shared: Arc<MockShared>,
}

impl MockTransport {
    /// A transport with one healthy arm attached
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport with no arm attached
    pub fn absent() -> Self {
        let mock = Self::new();
        mock.set_present(false);
        mock
    }

    /// Attach or detach the arm
    pub fn set_present(&self, present: bool) {
        self.shared.lock().present = present;
    }

    /// Make every open fail with `error` (`None` to clear)
    pub fn fail_open(&self, error: Option<rusb::Error>) {
        self.shared.lock().open_error = error;
    }

    /// Make every interface claim fail with `error` (`None` to clear)
    pub fn fail_claim(&self, error: Option<rusb::Error>) {
        self.shared.lock().claim_error = error;
    }

    /// Fail the next `count` transfers with `Pipe`
    pub fn fail_next_transfers(&self, count: usize) {
        self.shared.lock().failing_transfers = count;
    }

    /// Accept only `sent` bytes per transfer (`None` for full writes)
    pub fn short_writes(&self, sent: Option<usize>) {
        self.shared.lock().short_write = sent;
    }

    /// Keep transfers in flight until called again with `false`
    ///
    /// A held transfer is already recorded, so `wait_for_transfers` sees it.
    pub fn hold_transfers(&self, hold: bool) {
        self.shared.lock().hold = hold;
        self.shared.changed.notify_all();
    }

    /// Number of successful opens
    pub fn open_count(&self) -> usize {
        self.shared.lock().opens
    }

    /// Number of device closes
    pub fn close_count(&self) -> usize {
        self.shared.lock().closes
    }

    /// Settings passed to the most recent open attempt
    pub fn last_settings(&self) -> Option<DeviceSettings> {
        self.shared.lock().last_settings.clone()
    }

    /// Every transfer attempted so far, failed ones included
    pub fn recorded(&self) -> Vec<RecordedTransfer> {
        self.shared.lock().transfers.clone()
    }

    /// Command words of every transfer attempted so far
    pub fn transfers(&self) -> Vec<CommandWord> {
        self.shared
            .lock()
            .transfers
            .iter()
            .filter_map(RecordedTransfer::word)
            .collect()
    }

    /// Wait until at least `count` transfers were attempted
    pub fn wait_for_transfers(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |inner| inner.transfers.len() >= count)
    }

    /// Wait until at least `count` closes happened
    pub fn wait_for_closes(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |inner| inner.closes >= count)
    }

    fn wait_until(&self, timeout: Duration, mut done: impl FnMut(&MockInner) -> bool) -> bool {
        let guard = self.shared.lock();
        let (guard, _) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |inner| !done(inner))
            .unwrap_or_else(PoisonError::into_inner);
        done(&guard)
    }
}

impl UsbTransport for MockTransport {
    type Device = MockDevice;

    fn open(&self, settings: &DeviceSettings) -> Result<Self::Device, TransportError> {
        let mut inner = self.shared.lock();
        inner.last_settings = Some(settings.clone());

        if !inner.present {
            return Err(TransportError::NotFound {
                vendor_id: settings.vendor_id,
                product_id: settings.product_id,
            });
        }
        if let Some(e) = inner.open_error {
            return Err(TransportError::Open(e));
        }
        if let Some(e) = inner.claim_error {
            return Err(TransportError::Claim {
                interface: settings.interface,
                source: e,
            });
        }

        inner.opens += 1;
        Ok(MockDevice {
            shared: self.shared.clone(),
        })
    }
}

/// Device handed out by [`MockTransport`]
#[derive(Debug)]
pub struct MockDevice {
    shared: Arc<MockShared>,
}

impl ArmDevice for MockDevice {
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        let mut inner = self.shared.lock();
        inner.transfers.push(RecordedTransfer {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
            timeout,
        });
        self.shared.changed.notify_all();

        let mut inner = self
            .shared
            .changed
            .wait_while(inner, |inner| inner.hold)
            .unwrap_or_else(PoisonError::into_inner);

        if inner.failing_transfers > 0 {
            inner.failing_transfers -= 1;
            return Err(rusb::Error::Pipe);
        }
        Ok(inner.short_write.unwrap_or(data.len()).min(data.len()))
    }

    fn close(self) {
        self.shared.lock().closes += 1;
        self.shared.changed.notify_all();
    }
}

/// Poll `condition` until it holds or `timeout` expires
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
