//! Core type definitions
//!
//! These types provide strong typing for scheduler and timer primitives.

/// Task priority (0 = serviced first)
pub type TaskPrio = u8;

/// Reference-clock tick count (wrapping, 32 bits)
pub type Ticks = u32;

/// Raw hardware counter value, masked to the counter width
pub type CounterValue = u32;

/// Unit a timer duration is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeUnit {
    /// Reference-clock ticks
    #[default]
    Tics,
    /// Milliseconds, converted to ticks when armed
    Ms,
}

/// One-shot or self-rearming timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerKind {
    #[default]
    OneShot,
    Periodic,
}

/// Where a timer's callback runs on expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// Called directly from the compare interrupt
    Inline,
    /// Posted to the scheduler at the given priority
    Task(TaskPrio),
}

impl Dispatch {
    /// Dispatch target for a timer id: the lowest ids are reserved for inline
    /// slot-timing timers, the rest go through the scheduler.
    #[inline]
    pub fn for_timer_id(timer_id: u8, prio: TaskPrio) -> Self {
        if timer_id < crate::config::CFG_INLINE_TIMER_IDS {
            Dispatch::Inline
        } else {
            Dispatch::Task(prio)
        }
    }
}

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SchedState {
    Uninitialized = 0,
    /// All queues empty, run-loop waiting
    Idle = 1,
    /// A task callback is executing
    Running = 2,
}

impl SchedState {
    #[inline]
    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            1 => SchedState::Idle,
            2 => SchedState::Running,
            _ => SchedState::Uninitialized,
        }
    }
}
