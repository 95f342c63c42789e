//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the tone player and every board driver, exposing them through the
//! alarm ports ([`AlarmPorts`](crate::app::ports::AlarmPorts) is satisfied
//! by the blanket impl).  This is the only value the super-loop and the
//! extensions get to touch hardware through.  On non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.

use crate::app::ports::{
    AccelerometerPort, BoostPort, Button, ButtonPort, ClockPort, SleepDuration, SleepPort, Tune,
    TuneStream, WatchdogPort,
};
use crate::config::WarbleConfig;
use crate::drivers::accelerometer::Accelerometer;
use crate::drivers::button::{GpioButtons, RawInputPin};
use crate::drivers::sleep::LightSleep;
use crate::drivers::tone_timer::HwToneTimer;
use crate::drivers::watchdog::Watchdog;
use crate::sound::tone::ToneGenerator;
use crate::sound::tunes::SequencePlayer;

use super::time::Esp32Clock;

/// Tone generator on the board timers, sharing the static ISR state.
pub type BoardTone = ToneGenerator<'static, HwToneTimer>;

/// Buttons read straight from their GPIOs.
pub type BoardButtons = GpioButtons<RawInputPin, RawInputPin>;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    tune: SequencePlayer<BoardTone>,
    buttons: BoardButtons,
    accel: Accelerometer,
    sleeper: LightSleep,
    watchdog: Watchdog,
    clock: Esp32Clock,
}

impl HardwareAdapter {
    pub fn new(
        tone: BoardTone,
        warble: &WarbleConfig,
        buttons: BoardButtons,
        accel: Accelerometer,
        sleeper: LightSleep,
        watchdog: Watchdog,
        clock: Esp32Clock,
    ) -> Self {
        Self {
            tune: SequencePlayer::new(tone, warble),
            buttons,
            accel,
            sleeper,
            watchdog,
            clock,
        }
    }

    pub fn tone(&self) -> &BoardTone {
        self.tune.tone()
    }

    pub fn clock(&self) -> &Esp32Clock {
        &self.clock
    }
}

// ── TuneStream implementation ─────────────────────────────────

impl TuneStream for HardwareAdapter {
    fn play(&mut self, tune: Tune, now_us: u64) {
        self.tune.play(tune, now_us);
    }

    fn overlay(&mut self, tune: Tune, now_us: u64) {
        self.tune.overlay(tune, now_us);
    }

    fn is_playing(&self) -> bool {
        self.tune.is_playing()
    }

    fn update(&mut self, now_us: u64) {
        self.tune.update(now_us);
    }

    fn stop(&mut self) {
        self.tune.stop();
    }
}

// ── BoostPort implementation ──────────────────────────────────

impl BoostPort for HardwareAdapter {
    fn set_boost(&mut self, enabled: bool) {
        let tone = self.tune.tone_mut();
        if enabled {
            tone.start_boost();
        } else {
            tone.stop_boost();
        }
    }
}

// ── Sensor / input implementations ────────────────────────────

impl AccelerometerPort for HardwareAdapter {
    fn power_on(&mut self) {
        self.accel.power_on();
    }

    fn power_off(&mut self) {
        self.accel.power_off();
    }

    fn sample(&mut self) -> [i16; 3] {
        self.accel.sample()
    }
}

impl ButtonPort for HardwareAdapter {
    fn is_pressed(&mut self, button: Button) -> bool {
        self.buttons.is_pressed(button)
    }

    fn take_press(&mut self) -> bool {
        self.buttons.take_press()
    }
}

// ── Housekeeping implementations ──────────────────────────────

impl SleepPort for HardwareAdapter {
    fn sleep(&mut self, duration: SleepDuration) {
        self.sleeper.sleep(duration);
    }
}

impl WatchdogPort for HardwareAdapter {
    fn feed(&mut self) {
        self.watchdog.feed();
    }
}

impl ClockPort for HardwareAdapter {
    fn now_us(&self) -> u64 {
        self.clock.now_us()
    }
}
