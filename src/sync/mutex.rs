//! Mutex implementation
//!
//! Non-recursive lock for protocol state shared between tasks.

use portable_atomic::{AtomicBool, Ordering};

use crate::error::{OsError, OsResult};
use crate::time::AlarmClock;
use crate::types::Ticks;

use super::pend_until;

pub struct Mutex {
    locked: AtomicBool,
}

impl Mutex {
    pub const fn new() -> Self {
        Mutex {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire, waiting up to `timeout` ticks of `clock`
    ///
    /// A zero timeout is a try-lock and fails with `PendWouldBlock`.
    pub fn pend<C: AlarmClock>(&self, timeout: Ticks, clock: &C) -> OsResult<()> {
        pend_until(timeout, clock, || self.try_lock().then_some(()))
    }

    /// Release the lock
    ///
    /// # Returns
    /// * `Err(OsError::MutexNotOwner)` - The mutex was not locked
    pub fn release(&self) -> OsResult<()> {
        if !self.locked.swap(false, Ordering::AcqRel) {
            return Err(OsError::MutexNotOwner);
        }
        crate::port::signal_event();
        Ok(())
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}
