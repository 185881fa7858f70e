//! Event queue
//!
//! Bounded FIFO of callbacks drained by a dedicated consumer loop.

use heapless::Deque;

use crate::callback::Callback;
use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::time::AlarmClock;
use crate::types::Ticks;

use super::{pend_until, WAIT_FOREVER};

pub struct EventQueue<const N: usize> {
    events: CsCell<Deque<Callback, N>>,
}

impl<const N: usize> EventQueue<N> {
    pub const fn new() -> Self {
        EventQueue {
            events: CsCell::new(Deque::new()),
        }
    }

    /// Append an event. Callable from interrupt context.
    pub fn put(&self, event: Callback) -> OsResult<()> {
        critical_section(|cs| self.events.borrow_mut(cs).push_back(event))
            .map_err(|_| OsError::QFull)?;
        crate::port::signal_event();
        Ok(())
    }

    /// Oldest event, if any
    pub fn get_no_wait(&self) -> Option<Callback> {
        critical_section(|cs| self.events.borrow_mut(cs).pop_front())
    }

    /// Oldest event, waiting up to `timeout` ticks of `clock`
    pub fn get<C: AlarmClock>(&self, timeout: Ticks, clock: &C) -> OsResult<Callback> {
        pend_until(timeout, clock, || self.get_no_wait())
    }

    /// Wait for one event and run it
    pub fn run<C: AlarmClock>(&self, clock: &C) -> OsResult<()> {
        self.get(WAIT_FOREVER, clock)?.call();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.with(|q| q.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
