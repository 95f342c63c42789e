//! Horn and mode buttons.
//!
//! ## Hardware
//!
//! Two active-low momentary switches with pull-ups.  Levels are read
//! through [`embedded_hal::digital::InputPin`] so the driver works with any
//! HAL pin (and with plain mocks in tests).  Both GPIOs also fire a
//! falling-edge interrupt that sets a single press latch; a tap during a
//! long light sleep therefore still registers as a cancel.
//!
//! Debouncing is left to [`CodeEntry`](crate::code_entry::CodeEntry).

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::{ErrorType, InputPin};

use crate::app::ports::{Button, ButtonPort};

/// Set by the ISR on any falling edge, cleared by [`ButtonPort::take_press`].
static PRESS_LATCH: AtomicBool = AtomicBool::new(false);

/// ISR handler; register this on both button GPIOs' falling edge.
/// Safe to call from interrupt context (lock-free atomic store).
pub fn button_isr_handler() {
    PRESS_LATCH.store(true, Ordering::Release);
}

/// Both buttons, active low.
pub struct GpioButtons<H, M> {
    horn: H,
    mode: M,
}

impl<H: InputPin, M: InputPin> GpioButtons<H, M> {
    pub fn new(horn: H, mode: M) -> Self {
        Self { horn, mode }
    }
}

impl<H: InputPin, M: InputPin> ButtonPort for GpioButtons<H, M> {
    fn is_pressed(&mut self, button: Button) -> bool {
        // A pin read error reads as released.
        match button {
            Button::Horn => self.horn.is_low().unwrap_or(false),
            Button::Mode => self.mode.is_low().unwrap_or(false),
        }
    }

    fn take_press(&mut self) -> bool {
        PRESS_LATCH.swap(false, Ordering::AcqRel)
    }
}

/// A GPIO already configured as input by [`hw_init`](super::hw_init).
#[derive(Debug, Clone, Copy)]
pub struct RawInputPin(pub i32);

impl ErrorType for RawInputPin {
    type Error = Infallible;
}

impl InputPin for RawInputPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(super::hw_init::gpio_read(self.0))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!super::hw_init::gpio_read(self.0))
    }
}
