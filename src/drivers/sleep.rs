//! Bounded low-power naps.
//!
//! `Settle` and `Long` naps use light sleep with two wake sources: the
//! RTC timer and a low level on either button.  `Poll` naps are too short
//! to be worth the light-sleep entry cost (and would stall the tone
//! timer), so they are a plain FreeRTOS delay.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::trace;

use crate::app::ports::{SleepDuration, SleepPort};
#[cfg(target_os = "espidf")]
use crate::pins;

pub struct LightSleep {
    naps: u32,
}

impl Default for LightSleep {
    fn default() -> Self {
        Self::new()
    }
}

impl LightSleep {
    /// Arm the button GPIOs as light-sleep wake sources.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: configuration calls from the main task before the loop.
            unsafe {
                for pin in [pins::HORN_BUTTON_GPIO, pins::MODE_BUTTON_GPIO] {
                    gpio_wakeup_enable(pin, gpio_int_type_t_GPIO_INTR_LOW_LEVEL);
                }
                esp_sleep_enable_gpio_wakeup();
            }
        }
        Self { naps: 0 }
    }

    pub fn naps(&self) -> u32 {
        self.naps
    }

    #[cfg(target_os = "espidf")]
    fn nap(duration: SleepDuration) {
        let ms = duration.as_ms();
        match duration {
            SleepDuration::Poll => esp_idf_hal::delay::FreeRtos::delay_ms(ms),
            SleepDuration::Settle | SleepDuration::Long => {
                // SAFETY: light sleep returns on the timer or a button; the
                // wake sources were armed in new().
                unsafe {
                    esp_sleep_enable_timer_wakeup(u64::from(ms) * 1000);
                    esp_light_sleep_start();
                }
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn nap(duration: SleepDuration) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(duration.as_ms())));
    }
}

impl SleepPort for LightSleep {
    fn sleep(&mut self, duration: SleepDuration) {
        trace!("sleep: {:?} ({} ms)", duration, duration.as_ms());
        Self::nap(duration);
        self.naps = self.naps.wrapping_add(1);
    }
}
