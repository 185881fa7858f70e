//! Critical section protected cell
//!
//! Shared mutable state (queue set, pool slots, prescaler epoch) lives in a
//! `CsCell` and can only be reached through a live [`CriticalSection`].

use core::cell::UnsafeCell;

use crate::critical::{critical_section, CriticalSection};

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T>(UnsafeCell<T>);

// SAFETY: every access goes through a CriticalSection guard
unsafe impl<T: Send> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Borrow the inner value for the lifetime of the guard borrow.
    ///
    /// Callers must not hold two borrows of the same cell at once; nested
    /// guards do not make overlapping borrows sound.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub fn borrow_mut<'cs>(&'cs self, _cs: &'cs CriticalSection) -> &'cs mut T {
        // SAFETY: interrupts are masked for the guard's lifetime
        unsafe { &mut *self.0.get() }
    }

    /// Run `f` on the inner value inside a fresh critical section
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section(|cs| f(self.borrow_mut(cs)))
    }
}

impl<T: Copy> CsCell<T> {
    /// Copy the inner value out
    #[inline]
    pub fn get(&self) -> T {
        self.with(|v| *v)
    }

    /// Replace the inner value
    #[inline]
    pub fn set(&self, value: T) {
        self.with(|v| *v = value)
    }
}
