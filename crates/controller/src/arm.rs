//! Connection manager
//!
//! [`RoboticArm`] is the public control object. It owns the connection
//! lifecycle and the control worker, and turns caller commands into updates
//! of the shared command word.
//!
//! # Locking
//!
//! - `session` serializes `connect` and `disconnect` and holds the worker's
//!   join handle, which doubles as "a device handle is present".
//! - [`SharedState`] guards the status and the command word. It is only held
//!   for short, non-blocking sections, so `status()` and the send operations
//!   never wait on USB I/O.
//! - The init handshake has its own lock and condition variable, separate
//!   from the worker's steady-state wake-ups. Waiting on it is ordinary
//!   thread blocking, so `connect` may be called from any thread.
//!
//! # Example
//!
//! ```no_run
//! use controller::RoboticArm;
//! use protocol::{Action, Actuator, ConnectionStatus};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let arm = RoboticArm::open_default()?;
//! if arm.connect()? == ConnectionStatus::Connected {
//!     arm.send_command(Actuator::Light, Action::ON);
//!     arm.disconnect()?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::DeviceSettings;
use crate::error::{ControlError, Result};
use crate::state::{SharedState, init_channel};
use crate::usb::{ArmDevice, RusbTransport, TransportError, UsbTransport, spawn_control_worker};
use protocol::{Action, Actuator, CommandWord, ConnectionStatus, encode_batch, is_command_valid};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Control object for one USB robotic arm
pub struct RoboticArm<T: UsbTransport> {
    /// Source of devices
    transport: T,
    /// Which device to open and how to talk to it
    settings: DeviceSettings,
    /// Running control worker, if connected
    session: Mutex<Option<JoinHandle<T::Device>>>,
    /// Status and command word shared with the worker
    shared: Arc<SharedState>,
}

impl RoboticArm<RusbTransport> {
    /// Create a controller for the default arm over libusb
    ///
    /// Fails only if libusb cannot be initialized.
    pub fn open_default() -> Result<Self> {
        Self::open_with_settings(DeviceSettings::default())
    }

    /// Create a controller over libusb with explicit device settings
    pub fn open_with_settings(settings: DeviceSettings) -> Result<Self> {
        let transport = RusbTransport::new().map_err(|e| {
            error!("An error occurred while initializing the USB subsystem: {}", e);
            ControlError::Usb(e)
        })?;
        Ok(Self::new(transport, settings))
    }
}

impl<T: UsbTransport> RoboticArm<T> {
    /// Create a disconnected controller
    pub fn new(transport: T, settings: DeviceSettings) -> Self {
        Self {
            transport,
            settings,
            session: Mutex::new(None),
            shared: Arc::new(SharedState::new()),
        }
    }

    /// Device settings in use
    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    fn session(&self) -> MutexGuard<'_, Option<JoinHandle<T::Device>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect to the arm
    ///
    /// Returns the current status without doing anything if a session is
    /// already running. Otherwise locates, opens and claims the device,
    /// starts the control worker and waits for its initial reset write.
    pub fn connect(&self) -> Result<ConnectionStatus> {
        let mut session = self.session();

        if session.is_some() {
            let status = self.shared.status();
            debug!("Already connected, status: {}", status);
            return Ok(status);
        }

        {
            let mut state = self.shared.lock();
            if !matches!(
                state.status,
                ConnectionStatus::Disconnected
                    | ConnectionStatus::DeviceNotFound
                    | ConnectionStatus::ConnectionFailed
            ) {
                let message = format!(
                    "no device handle but status is '{}' when connecting",
                    state.status
                );
                error!("Assertion failed: {}", message);
                return Err(ControlError::InvariantViolation(message));
            }
            state.status = ConnectionStatus::Connecting;
        }

        info!(
            "Connecting to arm {:04x}:{:04x}",
            self.settings.vendor_id, self.settings.product_id
        );

        let device = match self.transport.open(&self.settings) {
            Ok(device) => device,
            Err(e) => {
                let status = match e {
                    TransportError::NotFound { .. } | TransportError::Enumerate(_) => {
                        ConnectionStatus::DeviceNotFound
                    }
                    TransportError::Open(_) | TransportError::Claim { .. } => {
                        ConnectionStatus::ConnectionFailed
                    }
                };
                warn!("Connection attempt failed: {} ({})", e, status);
                self.shared.set_status(status);
                return Ok(status);
            }
        };

        let (ready_tx, ready_rx) = init_channel();
        let worker = spawn_control_worker(
            device,
            self.shared.clone(),
            self.settings.transfer_timeout(),
            ready_tx,
        )
        .map_err(|e| {
            error!("Failed to spawn control worker: {}", e);
            self.shared.set_status(ConnectionStatus::ConnectionFailed);
            ControlError::WorkerSpawn(e)
        })?;

        // The worker always answers unless it panicked during the reset write
        let status = match ready_rx.wait() {
            Some(status) => status,
            None => {
                let _ = worker.join();
                error!("Control worker exited before finishing initialization");
                self.shared.set_status(ConnectionStatus::Disconnected);
                return Err(ControlError::WorkerPanicked);
            }
        };

        *session = Some(worker);
        info!("Connect finished: {}", status);
        Ok(status)
    }

    /// Disconnect from the arm
    ///
    /// Stops the control worker (which leaves the actuators stopped),
    /// releases the interface and closes the device. Without a session this
    /// only resets the status and touches no USB state.
    pub fn disconnect(&self) -> Result<ConnectionStatus> {
        let mut session = self.session();

        let Some(worker) = session.take() else {
            self.shared.set_status(ConnectionStatus::Disconnected);
            return Ok(ConnectionStatus::Disconnected);
        };

        {
            let state = self.shared.lock();
            if state.status == ConnectionStatus::Disconnected {
                drop(state);
                *session = Some(worker);
                let message = "device handle present but status is 'disconnected'".to_string();
                error!("Assertion failed: {}", message);
                return Err(ControlError::InvariantViolation(message));
            }
        }

        info!("Disconnecting from arm");
        self.shared.set_status(ConnectionStatus::Disconnecting);

        let device = match worker.join() {
            Ok(device) => device,
            Err(_) => {
                error!("Control worker panicked; device handle dropped");
                self.shared.set_status(ConnectionStatus::Disconnected);
                return Err(ControlError::WorkerPanicked);
            }
        };

        device.close();
        self.shared.set_status(ConnectionStatus::Disconnected);
        info!("Disconnected from arm");
        Ok(ConnectionStatus::Disconnected)
    }

    /// Set one actuator
    ///
    /// Invalid pairs return `InvalidCommand` without touching any state.
    /// While not connected the command is dropped and the current status is
    /// returned.
    pub fn send_command(&self, actuator: Actuator, action: Action) -> ConnectionStatus {
        if !is_command_valid(actuator, action) {
            debug!("Rejected invalid command {}={:?}", actuator, action);
            return ConnectionStatus::InvalidCommand;
        }
        self.send_commands([(actuator, action)])
    }

    /// Set several actuators in one update
    ///
    /// The batch is all or nothing: one invalid pair rejects all of them.
    pub fn send_commands<I>(&self, commands: I) -> ConnectionStatus
    where
        I: IntoIterator<Item = (Actuator, Action)>,
    {
        let commands: Vec<(Actuator, Action)> = commands.into_iter().collect();

        // Validate before taking the lock
        if let Err(e) = encode_batch(CommandWord::ZERO, commands.iter().copied()) {
            debug!("Rejected command batch: {}", e);
            return ConnectionStatus::InvalidCommand;
        }

        self.shared.update(|state| {
            if state.status.is_connected() {
                let word = encode_batch(state.command, commands).unwrap_or(state.command);
                if word != state.command {
                    debug!("Command word {} -> {}", state.command, word);
                    state.command = word;
                }
            }
            state.status
        })
    }

    /// Stop every actuator and switch the light off
    ///
    /// No-op unless connected with a non-zero command word.
    pub fn send_stop(&self) -> ConnectionStatus {
        self.shared.update(|state| {
            if state.status.is_connected() && !state.command.is_stopped() {
                debug!("Stopping all actuators");
                state.command = CommandWord::ZERO;
            }
            state.status
        })
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    /// Command word most recently requested
    pub fn command_word(&self) -> CommandWord {
        self.shared.snapshot().command
    }
}

impl<T: UsbTransport> Drop for RoboticArm<T> {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            error!("Failed to disconnect arm on drop: {}", e);
        }
    }
}

#[cfg(test)]
impl<T: UsbTransport> RoboticArm<T> {
    fn has_session(&self) -> bool {
        self.session().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransport;

    fn arm() -> (RoboticArm<MockTransport>, MockTransport) {
        let mock = MockTransport::new();
        (RoboticArm::new(mock.clone(), DeviceSettings::default()), mock)
    }

    #[test]
    fn test_new_arm_is_disconnected() {
        let (arm, mock) = arm();
        assert_eq!(arm.status(), ConnectionStatus::Disconnected);
        assert_eq!(arm.command_word(), CommandWord::ZERO);
        assert!(!arm.has_session());
        assert_eq!(mock.open_count(), 0);
    }

    #[test]
    fn test_connect_creates_session() {
        let (arm, _mock) = arm();
        assert_eq!(arm.connect().unwrap(), ConnectionStatus::Connected);
        assert!(arm.has_session());
        assert_eq!(arm.disconnect().unwrap(), ConnectionStatus::Disconnected);
        assert!(!arm.has_session());
    }

    #[test]
    fn test_invalid_command_leaves_word() {
        let (arm, _mock) = arm();
        arm.connect().unwrap();
        assert_eq!(
            arm.send_command(Actuator::Light, Action::Reverse),
            ConnectionStatus::InvalidCommand
        );
        assert_eq!(arm.command_word(), CommandWord::ZERO);
    }

    #[test]
    fn test_commands_dropped_while_disconnected() {
        let (arm, mock) = arm();
        assert_eq!(
            arm.send_command(Actuator::Base, Action::CW),
            ConnectionStatus::Disconnected
        );
        assert_eq!(arm.send_stop(), ConnectionStatus::Disconnected);
        assert_eq!(arm.command_word(), CommandWord::ZERO);
        assert!(mock.transfers().is_empty());
    }
}
