//! One-shot callout over a single timer object

use crate::callback::Callback;
use crate::config::CFG_INLINE_TIMER_IDS;
use crate::error::OsResult;
use crate::power::PowerManager;
use crate::time::AlarmClock;
use crate::types::{TaskPrio, Ticks, TimeUnit, TimerKind};

use super::{OpenTimers, TimerHandle};

/// Timer id callouts are created with (the first scheduler-dispatched id)
pub const CALLOUT_TIMER_ID: u8 = CFG_INLINE_TIMER_IDS;

/// A callback posted to the scheduler some ticks after each [`reset`](Self::reset)
///
/// Owns its timer object and returns it to the pool on drop.
pub struct Callout<'t, C: AlarmClock, P: PowerManager + 'static, const N: usize> {
    timers: &'t OpenTimers<C, P, N>,
    handle: TimerHandle,
    callback: Callback,
}

impl<'t, C: AlarmClock, P: PowerManager + 'static, const N: usize> Callout<'t, C, P, N> {
    /// Allocate the backing timer. Exhaustion is fatal, as for
    /// [`OpenTimers::create`].
    pub fn new(timers: &'t OpenTimers<C, P, N>, prio: TaskPrio, callback: Callback) -> Self {
        Callout {
            timers,
            handle: timers.create(CALLOUT_TIMER_ID, prio),
            callback,
        }
    }

    /// (Re)arm to fire `ticks` from now
    pub fn reset(&self, ticks: Ticks) -> OsResult<()> {
        self.timers
            .schedule_in(self.handle, ticks, TimeUnit::Tics, TimerKind::OneShot, self.callback)
    }

    pub fn stop(&self) -> OsResult<()> {
        self.timers.cancel(self.handle)
    }

    /// Armed and not yet fired
    pub fn is_active(&self) -> bool {
        self.timers.is_armed(self.handle)
    }

    #[inline]
    pub fn handle(&self) -> TimerHandle {
        self.handle
    }
}

impl<C: AlarmClock, P: PowerManager + 'static, const N: usize> Drop for Callout<'_, C, P, N> {
    fn drop(&mut self) {
        let _ = self.timers.destroy(self.handle);
    }
}
