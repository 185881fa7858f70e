//! Real-time coordination core for time-slotted low-power radio stacks
//!
//! Provides:
//! - A fixed-capacity, multi-priority task scheduler fed from ISR and thread context
//! - A compare-counter timer ("sctimer") with late-target and prescaler correction
//! - Poolable one-shot/periodic timer objects ("opentimers") multiplexed onto one alarm
//! - Semaphore, mutex and event-queue wrappers for protocol code built on top

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod opentimers;
pub mod port;
pub mod sctimer;
pub mod sync;

// ============ Re-exports ============

pub use crate::core::callback;
pub use crate::core::callback::Callback;
pub use crate::core::config;
pub use crate::core::config::*;
pub use crate::core::critical;
pub use crate::core::error;
pub use crate::core::error::{OsError, OsResult};
pub use crate::core::fault;
pub use crate::core::fault::Fault;
pub use crate::core::pool;
pub use crate::core::power;
pub use crate::core::power::{NoPowerManagement, PowerManager};
pub use crate::core::prio;
pub use crate::core::sched;
pub use crate::core::sched::Scheduler;
pub use crate::core::time;
pub use crate::core::types;
pub use crate::core::types::*;

pub use opentimers::{OpenTimers, TimerHandle};
pub use sctimer::SCTimer;

#[cfg(feature = "sem")]
pub use sync::sem;
#[cfg(feature = "mutex")]
pub use sync::mutex;
#[cfg(feature = "eventq")]
pub use sync::eventq;

#[cfg(feature = "pac")]
pub use stm32_metapac as pac;
