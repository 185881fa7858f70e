//! Software prescaler for slow or narrow hardware counters
//!
//! A counter running at `CFG_SCTIMER_FREQUENCY >> shift` and `bits` wide is
//! widened to a 32-bit virtual count at the reference frequency:
//!
//! ```text
//! virtual = ((epoch << bits) | hw) << shift
//! ```
//!
//! The epoch is advanced when the counter's top bit falls from 1 to 0. A latch
//! remembers that the top half was seen, so an epoch is counted exactly once
//! per wrap no matter how often the counter is read near the boundary. The
//! counter must be read at least once in each half of its period; the timer
//! keeps a compare armed a quarter period out whenever nothing else is.

use crate::config::CFG_SCTIMER_FREQUENCY;
use crate::core::time::wrap::counter_mask;

/// Left shift mapping a `hz` counter onto the reference frequency
///
/// Zero when `hz` is not a power-of-two fraction of the reference; such
/// counters are converted by the clock layer instead.
pub const fn prescale_shift(hz: u32) -> u32 {
    if hz != 0 && hz < CFG_SCTIMER_FREQUENCY && CFG_SCTIMER_FREQUENCY % hz == 0 {
        let ratio = CFG_SCTIMER_FREQUENCY / hz;
        if ratio.is_power_of_two() {
            return ratio.trailing_zeros();
        }
    }
    0
}

/// Whether a `bits`-wide counter shifted by `shift` needs an epoch
#[inline]
pub const fn needs_epoch(bits: u32, shift: u32) -> bool {
    bits + shift < 32
}

/// Epoch state
#[derive(Debug, Clone, Copy, Default)]
pub struct Prescaler {
    epoch: u32,
    high_seen: bool,
}

impl Prescaler {
    pub const fn new() -> Self {
        Prescaler {
            epoch: 0,
            high_seen: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Prescaler::new();
    }

    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Feed a raw counter reading and return the virtual count
    pub fn observe(&mut self, hw: u32, bits: u32, shift: u32) -> u32 {
        let hw = hw & counter_mask(bits);

        if needs_epoch(bits, shift) {
            let msb = hw >> (bits - 1) & 1 == 1;
            if msb {
                self.high_seen = true;
            } else if self.high_seen {
                self.high_seen = false;
                self.epoch = self.epoch.wrapping_add(1);
            }
        }

        compose(self.epoch, hw, bits, shift)
    }
}

/// Virtual count from an epoch and a raw reading
#[inline]
pub const fn compose(epoch: u32, hw: u32, bits: u32, shift: u32) -> u32 {
    let hw = hw & counter_mask(bits);
    let wide = if needs_epoch(bits, shift) {
        (epoch << bits) | hw
    } else {
        hw
    };
    wide << shift
}

/// Hardware compare value for a virtual target
///
/// Truncates: the compare may match up to one hardware tick before `target`.
#[inline]
pub const fn to_hw(target: u32, bits: u32, shift: u32) -> u32 {
    (target >> shift) & counter_mask(bits)
}
