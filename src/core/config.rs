//! Compile-time configuration
//!
//! These constants size the pools and queues and tune the compare-timer
//! corrections. All tick values are in reference ticks (`CFG_SCTIMER_FREQUENCY`).

/// Number of task priority levels (0 is serviced first)
pub const CFG_TASKPRIO_MAX: usize = 8;

/// Capacity of the scheduler's task pool
pub const CFG_TASK_LIST_DEPTH: usize = 20;

/// Capacity of the timer-object pool
pub const CFG_MAX_NUM_TIMERS: usize = 10;

/// Timer ids below this value run their callback inline in interrupt context
pub const CFG_INLINE_TIMER_IDS: u8 = 2;

/// Reference frequency the protocol layer counts in, in Hz
pub const CFG_SCTIMER_FREQUENCY: u32 = 32_768;

/// Minimum distance between now and a compare target for the hardware to latch it
pub const CFG_SCTIMER_MIN_COMP_ADVANCE: u32 = 10;

/// Offset used to re-arm an already late compare when the IRQ cannot be pended
pub const CFG_SCTIMER_ISR_NOW_OFFSET: u32 = 10;

/// Offset used to re-arm an already late compare when the IRQ is pended manually
pub const CFG_SCTIMER_ISR_NOW_OFFSET_PENDED: u32 = 1000;

/// Reference ticks per millisecond, rounded
pub const CFG_PORT_TICS_PER_MS: u32 = 33;

/// Largest lateness still treated as "fire now" by absolute scheduling.
///
/// Must exceed the longest interval the protocol ever schedules (65535 ms).
pub const CFG_LOOP_THRESHOLD: u32 = 2 * CFG_PORT_TICS_PER_MS * 65_535;

/// Milliseconds per second
pub const CFG_MS_PER_SEC: u32 = 1000;

const _: () = assert!(CFG_TASKPRIO_MAX >= 1 && CFG_TASKPRIO_MAX <= 256);
const _: () = assert!(CFG_TASK_LIST_DEPTH <= u16::MAX as usize);
const _: () = assert!(CFG_MAX_NUM_TIMERS <= u16::MAX as usize);
const _: () = assert!(CFG_LOOP_THRESHOLD < u32::MAX / 2);
