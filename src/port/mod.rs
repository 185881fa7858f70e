//! Port layer - CPU-specific implementations
//!
//! Run-loop sleep and wake, processor halt, and the hardware counters the
//! compare timer can drive.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

#[cfg(all(target_arch = "arm", feature = "pac"))]
pub mod stm32;

// Host implementations (for testing)
#[cfg(not(target_arch = "arm"))]
pub mod host {
    use crate::fault::Fault;

    /// Nothing to sleep on; the run-loop spins on its wake flag
    #[inline]
    pub fn wait_for_event() {
        core::hint::spin_loop();
    }

    #[inline]
    pub fn signal_event() {}

    pub fn halt() -> ! {
        panic!("halted")
    }

    pub fn fatal_halt(fault: Fault) -> ! {
        panic!("fatal fault: {:?}", fault)
    }
}

#[cfg(not(target_arch = "arm"))]
pub use host::*;

#[cfg(not(target_arch = "arm"))]
pub mod sim;
