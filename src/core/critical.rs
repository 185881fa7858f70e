//! Critical section handling
//!
//! Interrupt masking for the short, bounded regions that touch the queue set,
//! the pools, the compare register and the prescaler epoch.

use core::marker::PhantomData;

use critical_section::RestoreState;
use portable_atomic::{AtomicUsize, Ordering};

/// Number of live critical-section guards
static NESTING: AtomicUsize = AtomicUsize::new(0);

/// RAII guard for critical sections
///
/// Creating the guard masks interrupts and snapshots the previous mask state.
/// Dropping it restores exactly that snapshot, so nested guards only
/// re-enable interrupts when the outermost one is dropped.
pub struct CriticalSection {
    restore: RestoreState,
    // Must be dropped on the context that created it
    _not_send: PhantomData<*mut ()>,
}

impl CriticalSection {
    /// Enter a critical section by disabling interrupts.
    ///
    /// Returns a guard that will restore interrupt state when dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        // SAFETY: the matching release happens in Drop with this exact token
        let restore = unsafe { critical_section::acquire() };
        NESTING.fetch_add(1, Ordering::AcqRel);
        CriticalSection {
            restore,
            _not_send: PhantomData,
        }
    }

    /// Leave the critical section, restoring the state captured by `enter`
    #[inline(always)]
    pub fn exit(self) {
        drop(self)
    }

    /// Check if we're currently in a critical section
    ///
    /// Blocking primitives use this to fail fast instead of deadlocking with
    /// interrupts masked.
    #[inline(always)]
    pub fn is_active() -> bool {
        NESTING.load(Ordering::Acquire) > 0
    }

    /// Current nesting depth
    #[inline(always)]
    pub fn depth() -> usize {
        NESTING.load(Ordering::Acquire)
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        NESTING.fetch_sub(1, Ordering::AcqRel);
        // SAFETY: token obtained from the acquire in `enter`
        unsafe { critical_section::release(self.restore) };
    }
}

/// Execute a closure with interrupts disabled
///
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`](crate::core::cs_cell::CsCell) protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        let ipsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, IPSR",
                out(reg) ipsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        ipsr != 0
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}
