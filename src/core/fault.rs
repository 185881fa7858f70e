//! Fatal fault path
//!
//! Exhausting the task pool or the timer pool, or posting a task the
//! scheduler cannot accept, would silently drop real-time work, so it is
//! never reported as an error: the fault is logged, the
//! registered hook gets a chance to signal it (typically an error LED), and
//! the port halts the processor.

use crate::core::cs_cell::CsCell;

/// Unrecoverable conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Scheduler task pool full on `push_task`
    TaskListOverflow,
    /// Timer-object pool full on `create`
    TimerPoolExhausted,
    /// `push_task` with an out-of-range priority or before `init`
    TaskRejected,
}

static FAULT_HOOK: CsCell<Option<fn(Fault)>> = CsCell::new(None);

/// Install the hook run before halting
pub fn set_fault_hook(hook: fn(Fault)) {
    FAULT_HOOK.set(Some(hook));
}

/// Remove the installed hook
pub fn clear_fault_hook() {
    FAULT_HOOK.set(None);
}

/// Report `fault` and stop.
///
/// On ARM this resets the processor; on host builds it panics with the fault
/// name so tests can observe it.
#[cold]
#[inline(never)]
pub fn fatal(fault: Fault) -> ! {
    crate::error!("fatal fault: {}", fault);

    if let Some(hook) = FAULT_HOOK.get() {
        hook(fault);
    }

    crate::port::fatal_halt(fault)
}
