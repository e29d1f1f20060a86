//! Control state shared between caller threads and the control worker
//!
//! The connection status and the command word live under one mutex. Any
//! mutation a worker has to react to is followed by `notify_all` on the
//! paired condition variable; the worker waits on a predicate over the whole
//! state, so a wake-up that changed nothing is harmless.
//!
//! The one-time initialization handshake between `connect` and a freshly
//! spawned worker uses its own lock and condition variable ([`init_channel`])
//! so it never shares a wake-up path with steady-state command updates.

use protocol::{CommandWord, ConnectionStatus};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Snapshot of the shared state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub status: ConnectionStatus,
    pub command: CommandWord,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            command: CommandWord::ZERO,
        }
    }
}

/// Mutex-guarded state cell plus the worker's wake-up signal
#[derive(Debug, Default)]
pub struct SharedState {
    state: Mutex<ControlState>,
    changed: Condvar,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the state
    ///
    /// The guarded value is plain `Copy` data that is never left half
    /// written, so a poisoned lock is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ControlState {
        *self.lock()
    }

    /// Current status
    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    /// Replace the status and wake the worker
    pub fn set_status(&self, status: ConnectionStatus) {
        let mut state = self.lock();
        state.status = status;
        self.changed.notify_all();
    }

    /// Mutate the state under the lock and wake the worker
    pub fn update<R>(&self, f: impl FnOnce(&mut ControlState) -> R) -> R {
        let mut state = self.lock();
        let result = f(&mut state);
        self.changed.notify_all();
        result
    }

    /// Block until `wake` returns true for the current state
    ///
    /// Returns the state that satisfied the predicate.
    pub fn wait_until(&self, mut wake: impl FnMut(&ControlState) -> bool) -> ControlState {
        let guard = self.lock();
        let guard = self
            .changed
            .wait_while(guard, |state| !wake(state))
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Outcome of the worker's initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitSlot {
    Pending,
    Ready(ConnectionStatus),
    /// The worker went away without reporting
    Abandoned,
}

#[derive(Debug)]
struct InitRendezvous {
    slot: Mutex<InitSlot>,
    ready: Condvar,
}

impl InitRendezvous {
    fn post(&self, outcome: InitSlot) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if *slot == InitSlot::Pending {
            *slot = outcome;
            self.ready.notify_all();
        }
    }
}

/// Worker side of the initialization handshake
///
/// Dropping it without calling [`InitSender::send`] (e.g. while unwinding)
/// releases the waiting caller with `None`.
#[derive(Debug)]
pub struct InitSender {
    rendezvous: Arc<InitRendezvous>,
}

impl InitSender {
    /// Report the status reached after the initial reset write
    pub fn send(self, status: ConnectionStatus) {
        self.rendezvous.post(InitSlot::Ready(status));
    }
}

impl Drop for InitSender {
    fn drop(&mut self) {
        self.rendezvous.post(InitSlot::Abandoned);
    }
}

/// Caller side of the initialization handshake
#[derive(Debug)]
pub struct InitReceiver {
    rendezvous: Arc<InitRendezvous>,
}

impl InitReceiver {
    /// Block until the worker reports
    ///
    /// Plain thread blocking, so it is safe from any thread including one
    /// driving an async runtime. Returns `None` if the worker exited first.
    pub fn wait(self) -> Option<ConnectionStatus> {
        let slot = self
            .rendezvous
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = self
            .rendezvous
            .ready
            .wait_while(slot, |slot| *slot == InitSlot::Pending)
            .unwrap_or_else(PoisonError::into_inner);
        match *slot {
            InitSlot::Ready(status) => Some(status),
            InitSlot::Pending | InitSlot::Abandoned => None,
        }
    }
}

/// Create a connected init sender/receiver pair
pub fn init_channel() -> (InitSender, InitReceiver) {
    let rendezvous = Arc::new(InitRendezvous {
        slot: Mutex::new(InitSlot::Pending),
        ready: Condvar::new(),
    });
    (
        InitSender {
            rendezvous: rendezvous.clone(),
        },
        InitReceiver { rendezvous },
    )
}
