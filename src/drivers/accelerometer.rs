//! Analog three-axis accelerometer on a switched supply.
//!
//! The part draws ~350 µA, so the alarm powers it only around samples
//! while asleep.  Readings are raw 12-bit ADC counts; the motion detector
//! only ever looks at differences, so no scaling is applied.

use log::debug;

use super::hw_init::{adc1_read, gpio_write};
use crate::app::ports::AccelerometerPort;
use crate::pins;

pub struct Accelerometer {
    power_gpio: i32,
    channels: [u32; 3],
    powered: bool,
}

impl Default for Accelerometer {
    fn default() -> Self {
        Self::new(
            pins::ACCEL_POWER_GPIO,
            [
                pins::ACCEL_X_ADC_CHANNEL,
                pins::ACCEL_Y_ADC_CHANNEL,
                pins::ACCEL_Z_ADC_CHANNEL,
            ],
        )
    }
}

impl Accelerometer {
    pub fn new(power_gpio: i32, channels: [u32; 3]) -> Self {
        Self {
            power_gpio,
            channels,
            powered: false,
        }
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }
}

impl AccelerometerPort for Accelerometer {
    fn power_on(&mut self) {
        gpio_write(self.power_gpio, true);
        self.powered = true;
    }

    fn power_off(&mut self) {
        gpio_write(self.power_gpio, false);
        self.powered = false;
    }

    fn sample(&mut self) -> [i16; 3] {
        let s = self.channels.map(|ch| adc1_read(ch) as i16);
        debug!("accel: x={} y={} z={}", s[0], s[1], s[2]);
        s
    }
}
