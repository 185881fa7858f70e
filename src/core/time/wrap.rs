//! Wraparound-safe counter arithmetic
//!
//! Pure functions over fixed-width unsigned counters. Nothing here reads
//! hardware, so every "is behind" decision can be checked exhaustively near
//! `0`, near `2^W - 1` and in the middle of the range.

use crate::types::Ticks;

/// Value mask of a `bits`-wide counter
#[inline]
pub const fn counter_mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Ticks from `from` forward to `to` on a `bits`-wide counter
#[inline]
pub const fn forward_distance(from: u32, to: u32, bits: u32) -> u32 {
    to.wrapping_sub(from) & counter_mask(bits)
}

/// Ticks elapsed on the 32-bit reference clock since `since`
#[inline]
pub const fn elapsed(since: Ticks, now: Ticks) -> Ticks {
    now.wrapping_sub(since)
}

/// Whether a compare at `target` would be missed if programmed at `now`.
///
/// The forward distance is read as a signed `bits`-wide value: a target in
/// the back half of the range is already behind `now`, and a target ahead by
/// less than `min_advance` is too close for the comparator to latch. Either
/// way the alarm has to be forced.
#[inline]
pub const fn compare_is_late(now: u32, target: u32, min_advance: u32, bits: u32) -> bool {
    let ahead = forward_distance(now, target, bits);
    let half = if bits >= 32 { 1u32 << 31 } else { 1u32 << bits.saturating_sub(1) };
    ahead >= half || ahead < min_advance
}

/// Relative delay for an alarm at `reference + duration` observed at `now`.
///
/// A target passed by less than `loop_threshold` is late because of jitter
/// and fires immediately; anything else is in the future, including targets
/// that sit beyond a counter wrap.
#[inline]
pub const fn absolute_delay(now: Ticks, reference: Ticks, duration: Ticks, loop_threshold: Ticks) -> Ticks {
    let target = reference.wrapping_add(duration);
    let late = now.wrapping_sub(target);
    if late < loop_threshold {
        0
    } else {
        target.wrapping_sub(now)
    }
}

/// Whether `duration` is short enough for [`absolute_delay`] to tell a
/// future target from a late one.
#[inline]
pub const fn absolute_in_range(duration: Ticks, loop_threshold: Ticks) -> bool {
    duration <= u32::MAX - loop_threshold
}
