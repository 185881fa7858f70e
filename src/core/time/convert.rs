//! Rate conversion between clock domains
//!
//! A [`Converter`] maps tick deltas of a source frequency onto a target
//! frequency. Power-of-two ratios use shifts; anything else uses a reduced
//! fraction evaluated in 64 bits so no intermediate overflows.

use crate::config::{CFG_MS_PER_SEC, CFG_SCTIMER_FREQUENCY};
use crate::types::Ticks;

/// Source-to-target tick conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Converter {
    /// Same frequency
    Identity,
    /// Target is `2^n` times faster
    ShiftUp(u8),
    /// Target is `2^n` times slower
    ShiftDown(u8),
    /// `target = source * num / den`, reduced
    Frac { num: u32, den: u32 },
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Converter {
    /// Converter from `from_hz` ticks to `to_hz` ticks
    pub const fn between(from_hz: u32, to_hz: u32) -> Self {
        assert!(from_hz != 0 && to_hz != 0);

        if from_hz == to_hz {
            Converter::Identity
        } else if to_hz % from_hz == 0 && (to_hz / from_hz).is_power_of_two() {
            Converter::ShiftUp((to_hz / from_hz).trailing_zeros() as u8)
        } else if from_hz % to_hz == 0 && (from_hz / to_hz).is_power_of_two() {
            Converter::ShiftDown((from_hz / to_hz).trailing_zeros() as u8)
        } else {
            let g = gcd(from_hz, to_hz);
            Converter::Frac {
                num: to_hz / g,
                den: from_hz / g,
            }
        }
    }

    /// Exact ratio `(num, den)` with `target = source * num / den`
    pub const fn ratio(self) -> (u32, u32) {
        match self {
            Converter::Identity => (1, 1),
            Converter::ShiftUp(n) => (1 << n, 1),
            Converter::ShiftDown(n) => (1, 1 << n),
            Converter::Frac { num, den } => (num, den),
        }
    }

    /// Source delta to target delta, rounded down
    #[inline]
    pub const fn scale(self, delta: u32) -> u64 {
        match self {
            Converter::Identity => delta as u64,
            Converter::ShiftUp(n) => (delta as u64) << n,
            Converter::ShiftDown(n) => (delta as u64) >> n,
            Converter::Frac { num, den } => (delta as u64 * num as u64) / den as u64,
        }
    }

    /// Smallest source delta whose scaled value reaches `target_delta`
    #[inline]
    pub const fn unscale_ceil(self, target_delta: u32) -> u64 {
        match self {
            Converter::Identity => target_delta as u64,
            Converter::ShiftUp(n) => ((target_delta as u64) + (1u64 << n) - 1) >> n,
            Converter::ShiftDown(n) => (target_delta as u64) << n,
            Converter::Frac { num, den } => {
                (target_delta as u64 * den as u64 + num as u64 - 1) / num as u64
            }
        }
    }

    /// [`scale`](Self::scale) clamped to the 32-bit tick range
    #[inline]
    pub const fn scale_sat(self, delta: u32) -> u32 {
        let v = self.scale(delta);
        if v > u32::MAX as u64 {
            u32::MAX
        } else {
            v as u32
        }
    }
}

const MS_TO_TICKS: Converter = Converter::between(CFG_MS_PER_SEC, CFG_SCTIMER_FREQUENCY);
const TICKS_TO_MS: Converter = Converter::between(CFG_SCTIMER_FREQUENCY, CFG_MS_PER_SEC);

/// Milliseconds to reference ticks, saturating
#[inline]
pub const fn ms_to_ticks(ms: u32) -> Ticks {
    MS_TO_TICKS.scale_sat(ms)
}

/// Reference ticks to milliseconds, rounded down
#[inline]
pub const fn ticks_to_ms(ticks: Ticks) -> u32 {
    TICKS_TO_MS.scale_sat(ticks)
}

/// A millisecond period expressed in reference ticks, one period at a time
///
/// Each period is rounded down and the sub-tick remainder carried into the
/// next, so `k` consecutive periods always span `ms_to_ticks(k * ms)` ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsPeriod {
    ms: u32,
    carry: u32,
}

impl MsPeriod {
    pub const fn new(ms: u32) -> Self {
        MsPeriod { ms, carry: 0 }
    }

    #[inline]
    pub const fn ms(&self) -> u32 {
        self.ms
    }

    /// Length of the next period in reference ticks, saturating
    pub fn next_ticks(&mut self) -> Ticks {
        let (num, den) = MS_TO_TICKS.ratio();
        let total = self.ms as u64 * num as u64 + self.carry as u64;
        self.carry = (total % den as u64) as u32;
        (total / den as u64).min(u32::MAX as u64) as u32
    }
}
