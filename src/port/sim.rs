//! Simulated hardware counter for host builds
//!
//! Time only moves when the test calls [`SimCounter::tick`] or
//! [`SimCounter::advance`]. A compare match or a forced pend raises a pending
//! flag that the test services by calling the timer's interrupt entry point,
//! the way an NVIC would.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::core::time::wrap::counter_mask;
use crate::sctimer::HwCounter;
use crate::types::CounterValue;

/// `BITS`-wide counter ticking at `HZ`
pub struct SimCounter<const HZ: u32, const BITS: u32> {
    count: AtomicU32,
    compare: AtomicU32,
    armed: AtomicBool,
    pending: AtomicBool,
    powered: AtomicBool,
    can_pend: bool,
    inits: AtomicU32,
}

impl<const HZ: u32, const BITS: u32> SimCounter<HZ, BITS> {
    /// Counter whose interrupt can be pended by software
    pub const fn new() -> Self {
        Self::with_pend(true)
    }

    /// Counter that relies on the compare match alone
    pub const fn without_pend() -> Self {
        Self::with_pend(false)
    }

    const fn with_pend(can_pend: bool) -> Self {
        SimCounter {
            count: AtomicU32::new(0),
            compare: AtomicU32::new(0),
            armed: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            powered: AtomicBool::new(true),
            can_pend,
            inits: AtomicU32::new(0),
        }
    }

    /// Jump the counter to `value` without matching anything in between
    pub fn set_count(&self, value: CounterValue) {
        self.count.store(value & counter_mask(BITS), Ordering::Release);
    }

    /// Advance one tick. Returns whether the interrupt is pending afterwards.
    pub fn tick(&self) -> bool {
        if self.powered.load(Ordering::Acquire) {
            let next = self.count.load(Ordering::Acquire).wrapping_add(1) & counter_mask(BITS);
            self.count.store(next, Ordering::Release);
            if self.armed.load(Ordering::Acquire) && self.compare.load(Ordering::Acquire) == next {
                self.pending.store(true, Ordering::Release);
            }
        }
        self.is_pending()
    }

    /// Advance `n` ticks, running `irq` at most once per tick while the
    /// interrupt is pending
    ///
    /// A pend raised before the first tick is serviced first.
    pub fn advance(&self, n: u32, mut irq: impl FnMut()) {
        if self.take_pending() {
            irq();
        }
        for _ in 0..n {
            self.tick();
            // A pend raised by the handler itself is serviced on the next tick
            if self.take_pending() {
                irq();
            }
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Acknowledge the pending interrupt
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Programmed compare value, if the interrupt is enabled
    pub fn compare(&self) -> Option<CounterValue> {
        self.armed
            .load(Ordering::Acquire)
            .then(|| self.compare.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_powered(&self) -> bool {
        self.powered.load(Ordering::Acquire)
    }

    /// Number of `init` calls
    pub fn init_count(&self) -> u32 {
        self.inits.load(Ordering::Relaxed)
    }
}

impl<const HZ: u32, const BITS: u32> Default for SimCounter<HZ, BITS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const HZ: u32, const BITS: u32> HwCounter for SimCounter<HZ, BITS> {
    const BITS: u32 = BITS;
    const FREQUENCY: u32 = HZ;

    fn init(&self) {
        self.count.store(0, Ordering::Release);
        self.armed.store(false, Ordering::Release);
        self.pending.store(false, Ordering::Release);
        self.inits.fetch_add(1, Ordering::Relaxed);
    }

    fn now(&self) -> CounterValue {
        self.count.load(Ordering::Acquire)
    }

    fn set_compare(&self, value: CounterValue) {
        self.compare.store(value & counter_mask(BITS), Ordering::Release);
        self.armed.store(true, Ordering::Release);
    }

    fn clear_compare(&self) {
        self.armed.store(false, Ordering::Release);
    }

    fn force_pending(&self) -> bool {
        if self.can_pend {
            self.pending.store(true, Ordering::Release);
        }
        self.can_pend
    }

    fn power_on(&self) {
        self.powered.store(true, Ordering::Release);
    }

    fn power_off(&self) {
        self.powered.store(false, Ordering::Release);
    }
}
