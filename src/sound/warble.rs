//! Cooperative chirp sweep used by the horn and the alarm siren.
//!
//! Starts at the upper bound falling, then bounces between the bounds one
//! fixed step at a time.  Call [`Warble::update`] every loop iteration.

use super::ToneOutput;
use crate::config::WarbleConfig;

pub struct Warble {
    lower: u16,
    upper: u16,
    step: u16,
    rise_time_us: u32,
    fall_time_us: u32,
    frequency: u16,
    rising: bool,
    active: bool,
    last_update_us: u64,
    update_interval_us: u64,
}

impl Warble {
    pub fn new(config: &WarbleConfig) -> Self {
        let lower = config.lower_hz.min(config.upper_hz);
        let upper = config.upper_hz.max(config.lower_hz);
        Self {
            lower,
            upper,
            step: config.step_hz.max(1),
            rise_time_us: config.rise_time_us,
            fall_time_us: config.fall_time_us,
            frequency: upper,
            rising: false,
            active: false,
            last_update_us: 0,
            update_interval_us: 0,
        }
    }

    /// Time between steps for a sweep lasting `sweep_us`.
    fn time_step(&self, sweep_us: u32) -> u64 {
        let span = u64::from(self.upper - self.lower).max(1);
        u64::from(self.step) * u64::from(sweep_us) / span
    }

    pub fn start(&mut self, tone: &mut impl ToneOutput, now_us: u64) {
        self.rising = false;
        self.frequency = self.upper;
        self.last_update_us = now_us;
        self.update_interval_us = self.time_step(self.fall_time_us);
        self.active = true;
        tone.play(self.frequency);
    }

    /// Advance one step if the step interval has elapsed.
    /// Returns `true` when the frequency was changed.
    pub fn update(&mut self, tone: &mut impl ToneOutput, now_us: u64) -> bool {
        if !self.active || now_us.saturating_sub(self.last_update_us) <= self.update_interval_us {
            return false;
        }
        self.last_update_us = now_us;

        if self.rising {
            self.frequency = self.frequency.saturating_add(self.step).min(self.upper);
            if self.frequency == self.upper {
                self.rising = false;
                self.update_interval_us = self.time_step(self.fall_time_us);
            }
        } else {
            self.frequency = self.frequency.saturating_sub(self.step).max(self.lower);
            if self.frequency == self.lower {
                self.rising = true;
                self.update_interval_us = self.time_step(self.rise_time_us);
            }
        }
        tone.change(self.frequency);
        true
    }

    pub fn stop(&mut self, tone: &mut impl ToneOutput) {
        tone.stop();
        self.active = false;
    }

    pub fn frequency(&self) -> u16 {
        self.frequency
    }

    pub fn is_rising(&self) -> bool {
        self.rising
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
