//! Cortex-M4 port implementation
//!
//! The run-loop sleeps with `wfe`; producers wake it with `sev`, which also
//! covers the case where the post lands between the empty check and the sleep.

use crate::fault::Fault;

/// Sleep until an event or interrupt
#[inline(always)]
pub fn wait_for_event() {
    cortex_m::asm::wfe();
}

/// Wake a sleeping run-loop
#[inline(always)]
pub fn signal_event() {
    cortex_m::asm::sev();
}

/// Reset the processor
pub fn halt() -> ! {
    cortex_m::peripheral::SCB::sys_reset()
}

/// Fatal fault: the hook has already signalled it, reset
pub fn fatal_halt(_fault: Fault) -> ! {
    cortex_m::interrupt::disable();
    halt()
}

/// Mark external interrupt `irq` pending in the NVIC
///
/// # Safety
/// `irq` must be a valid interrupt number for the device.
#[inline]
pub unsafe fn pend_irq(irq: u16) {
    let nvic = cortex_m::peripheral::NVIC::PTR;
    let (reg, bit) = ((irq / 32) as usize, irq % 32);
    // SAFETY: ISPR is write-one-to-set, other bits are unaffected
    unsafe { (*nvic).ispr[reg].write(1 << bit) };
}

/// Enable external interrupt `irq` in the NVIC
///
/// # Safety
/// `irq` must be a valid interrupt number with a handler installed.
#[inline]
pub unsafe fn unmask_irq(irq: u16) {
    let nvic = cortex_m::peripheral::NVIC::PTR;
    let (reg, bit) = ((irq / 32) as usize, irq % 32);
    // SAFETY: ISER is write-one-to-set
    unsafe { (*nvic).iser[reg].write(1 << bit) };
}
