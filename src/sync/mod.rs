//! Synchronization primitives
//!
//! Semaphore, mutex and event queue for protocol code running on top of the
//! scheduler. Waiting is a sleep-and-retry loop on the port's event
//! primitive, bounded by a timeout measured on an [`AlarmClock`]; none of it
//! may be used from interrupt context or inside a critical section.

#[cfg(feature = "sem")]
pub mod sem;

#[cfg(feature = "mutex")]
pub mod mutex;

#[cfg(feature = "eventq")]
pub mod eventq;

#[cfg(any(feature = "sem", feature = "mutex", feature = "eventq"))]
use crate::{
    critical::{is_isr_context, CriticalSection},
    error::{OsError, OsResult},
    time::{wrap::elapsed, AlarmClock},
    types::Ticks,
};

/// Timeout that never expires
pub const WAIT_FOREVER: Ticks = Ticks::MAX;

/// Retry `attempt` until it yields a value or `timeout` ticks of `clock` pass
///
/// A zero timeout makes a single attempt.
#[cfg(any(feature = "sem", feature = "mutex", feature = "eventq"))]
pub(crate) fn pend_until<T, C: AlarmClock>(
    timeout: Ticks,
    clock: &C,
    mut attempt: impl FnMut() -> Option<T>,
) -> OsResult<T> {
    if let Some(v) = attempt() {
        return Ok(v);
    }
    if timeout == 0 {
        return Err(OsError::PendWouldBlock);
    }
    if is_isr_context() {
        return Err(OsError::PendIsr);
    }
    if CriticalSection::is_active() {
        // Nothing could ever release us with interrupts masked
        return Err(OsError::PendInCritical);
    }

    let start = clock.now();
    loop {
        crate::port::wait_for_event();

        if let Some(v) = attempt() {
            return Ok(v);
        }
        if timeout != WAIT_FOREVER && elapsed(start, clock.now()) >= timeout {
            return Err(OsError::Timeout);
        }
    }
}
