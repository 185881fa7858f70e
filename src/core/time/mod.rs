//! Time management module
//!
//! Wraparound-safe counter arithmetic, rate conversion between clock domains,
//! and the [`AlarmClock`] abstraction the timer-object layer multiplexes onto.

pub mod clock;
pub mod convert;
pub mod wrap;

pub use clock::{AlarmClock, ConvertedClock, ReferenceClock};
pub use convert::{ms_to_ticks, ticks_to_ms, Converter, MsPeriod};
pub use wrap::{absolute_delay, compare_is_late, counter_mask, elapsed, forward_distance};
