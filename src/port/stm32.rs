//! STM32F401 counter and fault LED
//!
//! TIM2 runs as a free 32-bit up-counter at 1 MHz with compare channel 1
//! raising the TIM2 interrupt. Its rate is not a power-of-two fraction of
//! the reference, so timer objects see it through a converted clock.

use crate::fault::Fault;
use crate::pac;
use crate::pac::gpio::vals::{Moder, Ot};
use crate::sctimer::HwCounter;
use crate::types::CounterValue;

/// TIM2 interrupt number on the F401
const TIM2_IRQ: u16 = 28;

/// Compare channel driving the alarm
const CH: usize = 0;

/// TIM2 as a 1 MHz compare counter
pub struct Tim2Counter {
    /// Prescaler register value for the bus timer clock
    psc: u16,
}

impl Tim2Counter {
    /// `timer_clock_hz` is the APB1 timer clock (84 MHz on a stock F401 setup)
    pub const fn new(timer_clock_hz: u32) -> Self {
        assert!(timer_clock_hz % 1_000_000 == 0);
        Tim2Counter {
            psc: (timer_clock_hz / 1_000_000 - 1) as u16,
        }
    }
}

impl HwCounter for Tim2Counter {
    const BITS: u32 = 32;
    const FREQUENCY: u32 = 1_000_000;

    fn init(&self) {
        pac::RCC.apb1enr().modify(|w| w.set_tim2en(true));

        let tim = pac::TIM2;
        tim.cr1().modify(|w| w.set_cen(false));
        tim.psc().write_value(self.psc);
        tim.arr().write_value(u32::MAX);
        tim.dier().modify(|w| w.set_ccie(CH, false));
        // Load the prescaler and zero the count
        tim.egr().write(|w| w.set_ug(true));
        tim.sr().write(|_| {});
        tim.cr1().modify(|w| w.set_cen(true));

        // SAFETY: TIM2_IRQ is the device's TIM2 vector
        unsafe { super::unmask_irq(TIM2_IRQ) };
    }

    fn now(&self) -> CounterValue {
        pac::TIM2.cnt().read()
    }

    fn set_compare(&self, value: CounterValue) {
        let tim = pac::TIM2;
        tim.ccr(CH).write_value(value);
        tim.sr().modify(|w| w.set_ccif(CH, false));
        tim.dier().modify(|w| w.set_ccie(CH, true));
    }

    fn clear_compare(&self) {
        let tim = pac::TIM2;
        tim.dier().modify(|w| w.set_ccie(CH, false));
        tim.sr().modify(|w| w.set_ccif(CH, false));
    }

    fn force_pending(&self) -> bool {
        // SAFETY: TIM2_IRQ is the device's TIM2 vector
        unsafe { super::pend_irq(TIM2_IRQ) };
        true
    }

    fn power_on(&self) {
        pac::RCC.apb1enr().modify(|w| w.set_tim2en(true));
    }

    fn power_off(&self) {
        pac::RCC.apb1enr().modify(|w| w.set_tim2en(false));
    }
}

/// Configure PA5 (user LED on Nucleo boards) as the fault indicator
pub fn fault_led_init() {
    pac::RCC.ahb1enr().modify(|w| w.set_gpioaen(true));
    pac::GPIOA.moder().modify(|w| w.set_moder(5, Moder::OUTPUT));
    pac::GPIOA.otyper().modify(|w| w.set_ot(5, Ot::PUSHPULL));
}

/// Fault hook: light the LED
///
/// Install with [`set_fault_hook`](crate::fault::set_fault_hook).
pub fn fault_led(_fault: Fault) {
    pac::GPIOA.bsrr().write(|w| w.set_bs(5, true));
}
