//! Three-state engine lifecycle shared with every derived handle.
//!
//! `Live → Releasing → Released`. Handles check the state on every access, so
//! they stop working the moment a release is requested rather than when the
//! engine's resources are physically destroyed.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Live,
    Releasing,
    Released,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Live,
            1 => LifecycleState::Releasing,
            _ => LifecycleState::Released,
        }
    }
}

pub struct Lifecycle {
    state: AtomicU8,
    released: Mutex<bool>,
    released_cv: Condvar,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Live as u8),
            released: Mutex::new(false),
            released_cv: Condvar::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_live(&self) -> bool {
        self.state() == LifecycleState::Live
    }

    /// Live → Releasing. Returns false if a release was already requested.
    pub(crate) fn begin_release(&self) -> bool {
        self.state
            .compare_exchange(
                LifecycleState::Live as u8,
                LifecycleState::Releasing as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub(crate) fn finish_release(&self) {
        self.state
            .store(LifecycleState::Released as u8, Ordering::SeqCst);
        let mut released = match self.released.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *released = true;
        self.released_cv.notify_all();
    }

    /// Block until the engine reaches `Released` or the timeout elapses.
    ///
    /// Returns true once released.
    pub fn wait_released(&self, timeout: Duration) -> bool {
        let guard = match self.released.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match self
            .released_cv
            .wait_timeout_while(guard, timeout, |released| !*released)
        {
            Ok((guard, _)) => *guard,
            Err(poisoned) => *poisoned.into_inner().0,
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .finish()
    }
}
