//! Semaphore implementation
//!
//! Counting semaphores for task synchronization and resource counting.

use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::time::AlarmClock;
use crate::types::Ticks;

use super::pend_until;

/// Semaphore counter type
pub type SemCount = u16;

/// Counting semaphore
pub struct Semaphore {
    count: CsCell<SemCount>,
}

impl Semaphore {
    pub const fn new(count: SemCount) -> Self {
        Semaphore {
            count: CsCell::new(count),
        }
    }

    /// Add one token. Callable from interrupt context.
    ///
    /// # Returns
    /// * `Ok(count)` - New token count
    /// * `Err(OsError::SemOvf)` - Counter overflow
    pub fn release(&self) -> OsResult<SemCount> {
        let count = critical_section(|cs| {
            let count = self.count.borrow_mut(cs);
            *count = count.checked_add(1).ok_or(OsError::SemOvf)?;
            Ok(*count)
        })?;
        crate::port::signal_event();
        Ok(count)
    }

    /// Take a token without waiting
    pub fn try_pend(&self) -> OsResult<()> {
        self.take().ok_or(OsError::PendWouldBlock)
    }

    /// Take a token, waiting up to `timeout` ticks of `clock`
    ///
    /// # Returns
    /// * `Ok(())` - Token taken
    /// * `Err(OsError::Timeout)` - Timeout expired
    /// * `Err(OsError::PendWouldBlock)` - `timeout` is 0 and no token is available
    /// * `Err(OsError::PendInCritical)` - Called with interrupts masked
    pub fn pend<C: AlarmClock>(&self, timeout: Ticks, clock: &C) -> OsResult<()> {
        pend_until(timeout, clock, || self.take())
    }

    pub fn count(&self) -> SemCount {
        self.count.get()
    }

    fn take(&self) -> Option<()> {
        critical_section(|cs| {
            let count = self.count.borrow_mut(cs);
            *count = count.checked_sub(1)?;
            Some(())
        })
    }
}
