//! Compare-counter timer
//!
//! Drives one hardware counter with a single compare channel. Callers work in
//! 32-bit virtual ticks at the reference frequency; the prescaler hides slow
//! or narrow counters, and [`SCTimer::set_compare`] corrects targets that are
//! already due or too close for the hardware to latch.
//!
//! A counter that needs a prescaler epoch is never left unwatched: with no
//! target armed the compare still fires every quarter hardware period, only
//! to read the counter, so wraps during idle time are counted.

pub mod prescaler;

use portable_atomic::{AtomicU32, Ordering};

use crate::callback::Callback;
use crate::config::{
    CFG_SCTIMER_ISR_NOW_OFFSET, CFG_SCTIMER_ISR_NOW_OFFSET_PENDED, CFG_SCTIMER_MIN_COMP_ADVANCE,
};
use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, CriticalSection};
use crate::time::wrap::compare_is_late;
use crate::time::AlarmClock;
use crate::types::{CounterValue, Ticks};

use prescaler::{needs_epoch, prescale_shift, to_hw, Prescaler};

/// Free-running hardware counter with one compare interrupt
pub trait HwCounter {
    /// Counter width in bits (1..=32)
    const BITS: u32;
    /// Native tick rate in Hz
    const FREQUENCY: u32;

    /// Start the counter from zero with the compare interrupt disabled
    fn init(&self);

    /// Raw counter value
    fn now(&self) -> CounterValue;

    /// Program the compare register and enable its interrupt
    fn set_compare(&self, value: CounterValue);

    /// Disable the compare interrupt
    fn clear_compare(&self);

    /// Mark the compare interrupt pending. Returns `false` if the platform
    /// cannot, in which case the compare is relied on instead.
    fn force_pending(&self) -> bool {
        false
    }

    fn power_on(&self) {}

    fn power_off(&self) {}
}

/// Compare-counter timer over a [`HwCounter`]
pub struct SCTimer<H: HwCounter> {
    hw: H,
    callback: CsCell<Option<Callback>>,
    prescaler: CsCell<Prescaler>,
    /// Virtual target of the armed compare
    target: CsCell<Option<Ticks>>,
    late_corrections: AtomicU32,
}

impl<H: HwCounter> SCTimer<H> {
    /// Prescaler shift for this counter
    pub const SHIFT: u32 = prescale_shift(H::FREQUENCY);

    /// Virtual ticks per hardware tick
    const TICK: u32 = 1 << Self::SHIFT;

    /// Whether the virtual count depends on reading every half period
    const WATCHED: bool = needs_epoch(H::BITS, Self::SHIFT);

    /// Longest distance armed at once. A quarter period leaves the epoch latch
    /// a quarter period of interrupt latency before a half is skipped.
    const MAX_STEP: u32 = if !Self::WATCHED {
        u32::MAX >> 1
    } else if H::BITS + Self::SHIFT >= 2 {
        1 << (H::BITS + Self::SHIFT - 2)
    } else {
        1
    };

    pub const fn new(hw: H) -> Self {
        assert!(H::BITS >= 1 && H::BITS <= 32);

        SCTimer {
            hw,
            callback: CsCell::new(None),
            prescaler: CsCell::new(Prescaler::new()),
            target: CsCell::new(None),
            late_corrections: AtomicU32::new(0),
        }
    }

    /// Clear the callback and restart the counter from zero
    pub fn init(&self) {
        critical_section(|cs| {
            *self.callback.borrow_mut(cs) = None;
            *self.target.borrow_mut(cs) = None;
            self.prescaler.borrow_mut(cs).reset();
            self.hw.init();
            self.watch(cs);
        });
        crate::debug!(
            "sctimer: init, {=u32} bits at {=u32} Hz, shift {=u32}",
            H::BITS,
            H::FREQUENCY,
            Self::SHIFT
        );
    }

    /// Register the compare callback, replacing any previous one
    pub fn set_callback(&self, cb: Callback) {
        critical_section(|cs| *self.callback.borrow_mut(cs) = Some(cb));
    }

    /// Arm the compare for virtual tick `target`
    ///
    /// A target that is already due, or closer than
    /// `CFG_SCTIMER_MIN_COMP_ADVANCE`, is moved a small offset past now and
    /// the interrupt is pended where the platform supports it.
    pub fn set_compare(&self, target: Ticks) {
        critical_section(|cs| {
            *self.target.borrow_mut(cs) = Some(target);
            self.arm(cs, target);
        });
    }

    /// Disarm the compare
    ///
    /// The callback will not run again until the next `set_compare`.
    pub fn cancel(&self) {
        critical_section(|cs| {
            *self.target.borrow_mut(cs) = None;
            self.watch(cs);
        });
    }

    /// Current virtual tick count
    pub fn read_counter(&self) -> Ticks {
        critical_section(|cs| self.read_locked(cs))
    }

    pub fn enable(&self) {
        self.hw.power_on();
        crate::debug!("sctimer: enabled");
    }

    /// Power the counter down. Call [`init`](Self::init) after re-enabling.
    pub fn disable(&self) {
        self.hw.power_off();
        crate::debug!("sctimer: disabled");
    }

    /// Compare interrupt entry point, called by the platform's ISR
    ///
    /// Runs the callback once the armed target is reached, never before the
    /// hardware tick that contains it. An early match (target beyond the
    /// hardware range, or a pended target that was too close to latch)
    /// re-arms for the remainder. A match with nothing armed only feeds the
    /// epoch latch.
    pub fn on_compare_irq(&self) {
        let due = critical_section(|cs| {
            let Some(target) = *self.target.borrow_mut(cs) else {
                self.watch(cs);
                return None;
            };
            let now = self.read_locked(cs);
            let ahead = target.wrapping_sub(now);

            if ahead < Self::TICK || ahead >= 1 << 31 {
                *self.target.borrow_mut(cs) = None;
                self.watch(cs);
                *self.callback.borrow_mut(cs)
            } else {
                self.arm(cs, target);
                None
            }
        });

        if let Some(cb) = due {
            cb.call();
        }
    }

    /// Late-target corrections applied since construction
    pub fn late_corrections(&self) -> u32 {
        self.late_corrections.load(Ordering::Relaxed)
    }

    /// The driven counter
    #[inline]
    pub fn counter(&self) -> &H {
        &self.hw
    }

    fn read_locked(&self, cs: &CriticalSection) -> Ticks {
        let raw = self.hw.now();
        self.prescaler.borrow_mut(cs).observe(raw, H::BITS, Self::SHIFT)
    }

    /// Keep reading a prescaled counter while no target is armed
    fn watch(&self, cs: &CriticalSection) {
        if Self::WATCHED {
            let now = self.read_locked(cs);
            let at = now.wrapping_add(Self::MAX_STEP);
            self.hw.set_compare(to_hw(at, H::BITS, Self::SHIFT));
        } else {
            self.hw.clear_compare();
        }
    }

    fn arm(&self, cs: &CriticalSection, target: Ticks) {
        let now = self.read_locked(cs);

        let at = if compare_is_late(now, target, CFG_SCTIMER_MIN_COMP_ADVANCE, 32) {
            let offset = if self.hw.force_pending() {
                CFG_SCTIMER_ISR_NOW_OFFSET_PENDED
            } else {
                CFG_SCTIMER_ISR_NOW_OFFSET
            };
            self.late_corrections.fetch_add(1, Ordering::Relaxed);
            crate::trace!("sctimer: late target {=u32}, now {=u32}", target, now);
            now.wrapping_add(offset.max(Self::TICK))
        } else if target.wrapping_sub(now) > Self::MAX_STEP {
            now.wrapping_add(Self::MAX_STEP)
        } else {
            target
        };

        self.hw.set_compare(to_hw(at, H::BITS, Self::SHIFT));
    }
}

impl<H: HwCounter> AlarmClock for SCTimer<H> {
    const FREQUENCY: u32 = H::FREQUENCY << Self::SHIFT;

    #[inline]
    fn now(&self) -> Ticks {
        self.read_counter()
    }

    #[inline]
    fn set_alarm(&self, target: Ticks) {
        self.set_compare(target)
    }

    #[inline]
    fn cancel_alarm(&self) {
        self.cancel()
    }

    #[inline]
    fn set_handler(&self, handler: Callback) {
        self.set_callback(handler)
    }
}
