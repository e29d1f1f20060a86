//! Control worker thread
//!
//! Dedicated thread that owns the arm for a whole session and performs
//! every control transfer. Callers never write to the device: they change
//! the shared command word and the worker re-asserts it.
//!
//! Lifecycle:
//! 1. Zero the command word, send it, record `Connected` or `IoError` and
//!    answer the init handshake exactly once.
//! 2. While `Connected`, sleep until the shared word differs from the last
//!    one sent or the status changes, and send each new word once. A failed
//!    send moves the status to `IoError` and is not retried.
//! 3. Leave the loop as soon as the status is anything but `Connected`
//!    (`IoError` or a requested disconnect), send a final zero word so the
//!    actuators stop, and hand the device back to the joiner.

use crate::state::{InitSender, SharedState};
use crate::usb::{ArmDevice, send_command_word};
use protocol::{CommandWord, ConnectionStatus};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the control worker thread
pub const WORKER_THREAD_NAME: &str = "arm-control";

/// The control worker
///
/// Owns the device and a handle to the shared state.
pub struct ControlWorker<D: ArmDevice> {
    /// Opened arm, exclusively owned while the worker runs
    device: D,
    /// State shared with the connection manager
    shared: Arc<SharedState>,
    /// Control transfer timeout (zero = unlimited)
    timeout: Duration,
}

impl<D: ArmDevice> ControlWorker<D> {
    pub fn new(device: D, shared: Arc<SharedState>, timeout: Duration) -> Self {
        Self {
            device,
            shared,
            timeout,
        }
    }

    /// Run the worker until the status leaves `Connected`
    ///
    /// `ready` receives the status after the initial reset write. The device
    /// is returned so the caller can release and close it after joining.
    pub fn run(mut self, ready: InitSender) -> D {
        info!("Control worker started");

        // Stop every actuator before accepting commands. Commands are dropped
        // while the status is still `Connecting`, so the word stays zero
        // until the status below is published.
        self.shared.lock().command = CommandWord::ZERO;
        let status = self.transmit(CommandWord::ZERO);
        self.shared.set_status(status);
        ready.send(status);

        let mut last_sent = CommandWord::ZERO;

        loop {
            let observed = self.shared.wait_until(|state| {
                state.status != ConnectionStatus::Connected || state.command != last_sent
            });

            if observed.status != ConnectionStatus::Connected {
                debug!("Control worker leaving loop, status: {}", observed.status);
                break;
            }

            last_sent = observed.command;
            if self.transmit(observed.command) == ConnectionStatus::IoError {
                // A disconnect may have raced the transfer; don't overwrite it
                self.shared.update(|state| {
                    if state.status == ConnectionStatus::Connected {
                        state.status = ConnectionStatus::IoError;
                    }
                });
            }
        }

        // Leave the arm stopped; nobody is left to act on a failure
        if self.transmit(CommandWord::ZERO) == ConnectionStatus::IoError {
            debug!("Final stop write failed");
        }

        info!("Control worker stopped");
        self.device
    }

    /// Send one word and translate the outcome into a status
    fn transmit(&mut self, word: CommandWord) -> ConnectionStatus {
        match send_command_word(&mut self.device, word, self.timeout) {
            Ok(()) => ConnectionStatus::Connected,
            Err(e) => {
                warn!("Control transfer failed: {}", e);
                ConnectionStatus::IoError
            }
        }
    }
}

/// Spawn the control worker thread
///
/// The thread runs until the shared status leaves `Connected` and returns
/// the device through its join handle.
pub fn spawn_control_worker<D: ArmDevice>(
    device: D,
    shared: Arc<SharedState>,
    timeout: Duration,
    ready: InitSender,
) -> std::io::Result<JoinHandle<D>> {
    std::thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || ControlWorker::new(device, shared, timeout).run(ready))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceSettings;
    use crate::state::init_channel;
    use crate::test_utils::{DEFAULT_TEST_TIMEOUT, MockDevice, MockTransport};
    use crate::usb::UsbTransport;

    fn start(mock: &MockTransport, shared: &Arc<SharedState>) -> JoinHandle<MockDevice> {
        let device = mock.open(&DeviceSettings::default()).unwrap();
        let (ready_tx, ready_rx) = init_channel();
        let handle =
            spawn_control_worker(device, shared.clone(), Duration::ZERO, ready_tx).unwrap();
        assert_eq!(ready_rx.wait(), Some(ConnectionStatus::Connected));
        handle
    }

    #[test]
    fn test_worker_thread_is_named() {
        let mock = MockTransport::new();
        let shared = Arc::new(SharedState::new());
        let handle = start(&mock, &shared);
        assert_eq!(handle.thread().name(), Some(WORKER_THREAD_NAME));

        shared.set_status(ConnectionStatus::Disconnecting);
        handle.join().unwrap().close();
        assert!(mock.wait_for_closes(1, DEFAULT_TEST_TIMEOUT));
    }

    #[test]
    fn test_failed_write_stops_worker() {
        let mock = MockTransport::new();
        let shared = Arc::new(SharedState::new());
        let handle = start(&mock, &shared);

        mock.fail_next_transfers(1);
        shared.update(|state| state.command = CommandWord(0x100));

        // The worker exits on its own once the status becomes `IoError`
        let device = handle.join().unwrap();
        assert_eq!(shared.status(), ConnectionStatus::IoError);
        assert_eq!(
            mock.transfers(),
            vec![CommandWord::ZERO, CommandWord(0x100), CommandWord::ZERO]
        );
        device.close();
    }

    #[test]
    fn test_failed_write_keeps_pending_disconnect() {
        let mock = MockTransport::new();
        let shared = Arc::new(SharedState::new());
        let handle = start(&mock, &shared);

        // Hold the failing transfer in flight while a disconnect is requested
        mock.fail_next_transfers(1);
        mock.hold_transfers(true);
        shared.update(|state| state.command = CommandWord(0x10));
        assert!(mock.wait_for_transfers(2, DEFAULT_TEST_TIMEOUT));

        shared.set_status(ConnectionStatus::Disconnecting);
        mock.hold_transfers(false);

        let device = handle.join().unwrap();
        assert_eq!(shared.status(), ConnectionStatus::Disconnecting);
        assert_eq!(mock.transfers().last(), Some(&CommandWord::ZERO));
        device.close();
        assert_eq!(mock.close_count(), 1);
    }
}
