//! Alarm clocks
//!
//! An [`AlarmClock`] is a 32-bit wrapping tick source with one alarm. The
//! timer-object layer always runs on the reference frequency; a base clock at
//! another rate is wrapped in a [`ConvertedClock`], and [`ReferenceClock`]
//! makes that choice once, at construction.

use crate::callback::Callback;
use crate::config::CFG_SCTIMER_FREQUENCY;
use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, CriticalSection};
use crate::types::Ticks;

use super::convert::Converter;

/// 32-bit wrapping tick source with a single alarm
pub trait AlarmClock {
    /// Tick rate in Hz
    const FREQUENCY: u32;

    /// Current tick count
    fn now(&self) -> Ticks;

    /// Arm the alarm for `target`. Replaces any previous alarm.
    ///
    /// A target that is already due must still fire promptly.
    fn set_alarm(&self, target: Ticks);

    /// Disarm the alarm
    fn cancel_alarm(&self);

    /// Register the function run when the alarm fires
    fn set_handler(&self, handler: Callback);
}

impl<C: AlarmClock + ?Sized> AlarmClock for &C {
    const FREQUENCY: u32 = C::FREQUENCY;

    #[inline]
    fn now(&self) -> Ticks {
        (**self).now()
    }

    #[inline]
    fn set_alarm(&self, target: Ticks) {
        (**self).set_alarm(target)
    }

    #[inline]
    fn cancel_alarm(&self) {
        (**self).cancel_alarm()
    }

    #[inline]
    fn set_handler(&self, handler: Callback) {
        (**self).set_handler(handler)
    }
}

#[derive(Clone, Copy)]
struct Anchor {
    base: Ticks,
    reference: Ticks,
}

/// Presents a base clock at the reference frequency
///
/// Only whole multiples of the converter denominator are folded into the
/// anchor, so repeated reads never accumulate rounding error. The anchor has
/// to be sampled at least once per base-clock wrap: a cancelled alarm leaves
/// a wake-up half a base period out instead of disarming the base clock.
pub struct ConvertedClock<C> {
    base: C,
    conv: Converter,
    anchor: CsCell<Anchor>,
}

impl<C: AlarmClock> ConvertedClock<C> {
    /// Longest base-clock distance between two anchor samples
    const ANCHOR_WATCH: Ticks = u32::MAX >> 1;

    pub const fn new(base: C) -> Self {
        ConvertedClock {
            base,
            conv: Converter::between(C::FREQUENCY, CFG_SCTIMER_FREQUENCY),
            anchor: CsCell::new(Anchor { base: 0, reference: 0 }),
        }
    }

    /// Base-to-reference converter in use
    #[inline]
    pub fn converter(&self) -> Converter {
        self.conv
    }

    /// Underlying clock
    #[inline]
    pub fn base(&self) -> &C {
        &self.base
    }

    /// Restart the reference count at zero from the current base reading
    pub fn resync(&self) {
        critical_section(|cs| {
            *self.anchor.borrow_mut(cs) = Anchor {
                base: self.base.now(),
                reference: 0,
            };
        });
    }

    /// Current (base, reference) pair, advancing the anchor
    fn sample(&self, cs: &CriticalSection) -> (Ticks, Ticks) {
        let anchor = self.anchor.borrow_mut(cs);
        let base_now = self.base.now();
        let delta = base_now.wrapping_sub(anchor.base);

        let (num, den) = self.conv.ratio();
        let whole = delta - delta % den;
        if whole != 0 {
            anchor.base = anchor.base.wrapping_add(whole);
            anchor.reference = anchor
                .reference
                .wrapping_add(((whole / den) as u64 * num as u64) as u32);
        }

        let rest = self.conv.scale(delta - whole) as u32;
        (base_now, anchor.reference.wrapping_add(rest))
    }
}

impl<C: AlarmClock> AlarmClock for ConvertedClock<C> {
    const FREQUENCY: u32 = CFG_SCTIMER_FREQUENCY;

    fn now(&self) -> Ticks {
        critical_section(|cs| self.sample(cs).1)
    }

    fn set_alarm(&self, target: Ticks) {
        critical_section(|cs| {
            let (base_now, ref_now) = self.sample(cs);
            let ahead = target.wrapping_sub(ref_now);

            // Past targets fire on the next base tick
            let base_delta = if ahead >= 1 << 31 {
                0
            } else {
                let d = self.conv.unscale_ceil(ahead);
                if d > Self::ANCHOR_WATCH as u64 {
                    // Wakes early; the alarm handler re-arms for the remainder
                    Self::ANCHOR_WATCH
                } else {
                    d as u32
                }
            };

            self.base.set_alarm(base_now.wrapping_add(base_delta));
        });
    }

    fn cancel_alarm(&self) {
        critical_section(|cs| {
            let (base_now, _) = self.sample(cs);
            self.base.set_alarm(base_now.wrapping_add(Self::ANCHOR_WATCH));
        });
    }

    fn set_handler(&self, handler: Callback) {
        self.base.set_handler(handler)
    }
}

/// The clock timer objects run on
pub enum ReferenceClock<C> {
    /// Base clock already runs at the reference frequency
    Native(C),
    /// Base clock converted to the reference frequency
    Converted(ConvertedClock<C>),
}

impl<C: AlarmClock> ReferenceClock<C> {
    /// Wrap `base`, converting only if its frequency differs
    pub const fn select(base: C) -> Self {
        if C::FREQUENCY == CFG_SCTIMER_FREQUENCY {
            ReferenceClock::Native(base)
        } else {
            ReferenceClock::Converted(ConvertedClock::new(base))
        }
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        matches!(self, ReferenceClock::Native(_))
    }

    /// Underlying clock
    pub fn base(&self) -> &C {
        match self {
            ReferenceClock::Native(c) => c,
            ReferenceClock::Converted(c) => c.base(),
        }
    }
}

impl<C: AlarmClock> AlarmClock for ReferenceClock<C> {
    const FREQUENCY: u32 = CFG_SCTIMER_FREQUENCY;

    #[inline]
    fn now(&self) -> Ticks {
        match self {
            ReferenceClock::Native(c) => c.now(),
            ReferenceClock::Converted(c) => c.now(),
        }
    }

    #[inline]
    fn set_alarm(&self, target: Ticks) {
        match self {
            ReferenceClock::Native(c) => c.set_alarm(target),
            ReferenceClock::Converted(c) => c.set_alarm(target),
        }
    }

    #[inline]
    fn cancel_alarm(&self) {
        match self {
            ReferenceClock::Native(c) => c.cancel_alarm(),
            ReferenceClock::Converted(c) => c.cancel_alarm(),
        }
    }

    fn set_handler(&self, handler: Callback) {
        match self {
            ReferenceClock::Native(c) => c.set_handler(handler),
            ReferenceClock::Converted(c) => c.set_handler(handler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicU32, Ordering};

    struct Manual<const HZ: u32> {
        now: AtomicU32,
        alarm: AtomicU32,
    }

    impl<const HZ: u32> Manual<HZ> {
        const fn new() -> Self {
            Manual {
                now: AtomicU32::new(0),
                alarm: AtomicU32::new(0),
            }
        }
    }

    impl<const HZ: u32> AlarmClock for Manual<HZ> {
        const FREQUENCY: u32 = HZ;

        fn now(&self) -> Ticks {
            self.now.load(Ordering::Relaxed)
        }

        fn set_alarm(&self, target: Ticks) {
            self.alarm.store(target, Ordering::Relaxed);
        }

        fn cancel_alarm(&self) {}

        fn set_handler(&self, _handler: Callback) {}
    }

    #[test]
    fn test_converted_clock_does_not_drift() {
        let base = Manual::<1_000_000>::new();
        let clock = ConvertedClock::new(&base);

        // Many small reads must agree with one large one
        for step in 1..=10_000u32 {
            base.now.store(step * 37, Ordering::Relaxed);
            clock.now();
        }
        let expected = (10_000u64 * 37 * 32_768 / 1_000_000) as u32;
        assert_eq!(clock.now(), expected);
    }

    #[test]
    fn test_converted_alarm_rounds_up() {
        let base = Manual::<1_000_000>::new();
        let clock = ConvertedClock::new(&base);
        base.now.store(1_000, Ordering::Relaxed);
        let now = clock.now();

        clock.set_alarm(now.wrapping_add(1));
        let armed = base.alarm.load(Ordering::Relaxed);
        base.now.store(armed, Ordering::Relaxed);
        assert!(clock.now().wrapping_sub(now) >= 1);
    }

    #[test]
    fn test_cancel_leaves_anchor_watch() {
        let base = Manual::<1_000_000>::new();
        let clock = ConvertedClock::new(&base);
        base.now.store(5_000, Ordering::Relaxed);

        clock.cancel_alarm();
        assert_eq!(base.alarm.load(Ordering::Relaxed), 5_000 + (u32::MAX >> 1));

        // Sampled on that wake-up, the count keeps running past the base wrap
        base.now.store(5_000u32.wrapping_add(u32::MAX >> 1), Ordering::Relaxed);
        let before = clock.now();
        base.now.store(5_000u32.wrapping_add(u32::MAX), Ordering::Relaxed);
        assert!(clock.now().wrapping_sub(before) > 0);
    }

    #[test]
    fn test_select_converts_foreign_rate() {
        let base = Manual::<1_000_000>::new();
        let clock = ReferenceClock::select(&base);
        assert!(!clock.is_native());
    }

    #[test]
    fn test_select_keeps_native_rate() {
        let base = Manual::<32_768>::new();
        let clock = ReferenceClock::select(&base);
        assert!(clock.is_native());

        base.now.store(12_345, Ordering::Relaxed);
        assert_eq!(clock.now(), 12_345);
        clock.set_alarm(20_000);
        assert_eq!(base.alarm.load(Ordering::Relaxed), 20_000);
    }
}
