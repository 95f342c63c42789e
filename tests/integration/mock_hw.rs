//! Mock hardware adapter for integration tests.
//!
//! Records every port call so tests can assert on the full command history
//! without touching real timers or GPIO.  Time only moves when the code
//! under test sleeps (or a test calls [`MockHardware::advance_ms`]), so
//! every scenario is deterministic.

use bikehorn::app::events::AlarmEvent;
use bikehorn::app::ports::{
    AccelerometerPort, BoostPort, Button, ButtonPort, ClockPort, EventSink, SleepDuration,
    SleepPort, Tune, TuneStream, WatchdogPort,
};

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwCall {
    PowerOn,
    PowerOff,
    Play(Tune),
    Overlay(Tune),
    StopTune,
    Boost(bool),
    Sleep(SleepDuration),
}

/// A button held from `start_ms` (inclusive) to `end_ms` (exclusive).
#[derive(Debug, Clone, Copy)]
pub struct Press {
    pub button: Button,
    pub start_ms: u32,
    pub end_ms: u32,
}

/// Hold time and gap used by [`MockHardware::enter_code`].
pub const KEY_HOLD_MS: u32 = 100;
pub const KEY_GAP_MS: u32 = 100;

/// Resting accelerometer reading with a little sensor noise.
pub fn still(i: u32) -> [i16; 3] {
    let wobble = [0, 1, 0, -1][(i % 4) as usize];
    [512 + wobble, 300 - wobble, 700]
}

/// How long the mock "plays" each tune.  `None` loops forever.
fn tune_length_ms(tune: Tune) -> Option<u32> {
    match tune {
        Tune::Acknowledge => Some(300),
        Tune::Countdown => Some(15_000),
        Tune::Error => Some(400),
        Tune::Warble | Tune::Sos => None,
    }
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<HwCall>,
    pub now_us: u64,
    pub presses: Vec<Press>,
    /// Latch horizon: presses starting at or before this were taken.
    taken_until_ms: Option<u32>,
    pending_shake: Option<i16>,
    pub samples: u32,
    pub feeds: u32,
    pub updates: u32,
    pub powered: bool,
    pub boost: bool,
    /// Free-form trail for test extensions to write their hooks into.
    pub notes: Vec<String>,
    tune: Option<(Tune, u64)>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            // Away from zero so "press at now" never aliases the latch horizon.
            now_us: 1_000_000,
            presses: Vec::new(),
            taken_until_ms: None,
            pending_shake: None,
            samples: 0,
            feeds: 0,
            updates: 0,
            powered: false,
            boost: false,
            notes: Vec::new(),
            tune: None,
        }
    }

    pub fn advance_ms(&mut self, ms: u32) {
        self.now_us += u64::from(ms) * 1000;
    }

    /// Schedule a press `delay_ms` from now.
    pub fn press(&mut self, button: Button, delay_ms: u32, hold_ms: u32) {
        let start_ms = self.now_ms() + delay_ms;
        self.presses.push(Press {
            button,
            start_ms,
            end_ms: start_ms + hold_ms,
        });
    }

    /// Schedule a PIN, horn for `true` and mode for `false`, starting
    /// `delay_ms` from now.  Returns when the last key is released.
    pub fn enter_code(&mut self, delay_ms: u32, keys: &[bool]) -> u32 {
        let mut at = delay_ms;
        for &horn in keys {
            let button = if horn { Button::Horn } else { Button::Mode };
            self.press(button, at, KEY_HOLD_MS);
            at += KEY_HOLD_MS + KEY_GAP_MS;
        }
        self.now_ms() + at
    }

    /// The next accelerometer sample jumps by `amplitude` on x.
    pub fn shake_next(&mut self, amplitude: i16) {
        self.pending_shake = Some(amplitude);
    }

    pub fn current_tune(&self) -> Option<Tune> {
        self.tune.map(|(t, _)| t)
    }

    pub fn count(&self, call: HwCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelerometerPort for MockHardware {
    fn power_on(&mut self) {
        self.powered = true;
        self.calls.push(HwCall::PowerOn);
    }

    fn power_off(&mut self) {
        self.powered = false;
        self.calls.push(HwCall::PowerOff);
    }

    fn sample(&mut self) -> [i16; 3] {
        assert!(self.powered, "sampled an unpowered accelerometer");
        let mut s = still(self.samples);
        self.samples += 1;
        if let Some(amplitude) = self.pending_shake.take() {
            s[0] = s[0].saturating_add(amplitude);
        }
        s
    }
}

impl ButtonPort for MockHardware {
    fn is_pressed(&mut self, button: Button) -> bool {
        let now = self.now_ms();
        self.presses
            .iter()
            .any(|p| p.button == button && p.start_ms <= now && now < p.end_ms)
    }

    fn take_press(&mut self) -> bool {
        let now = self.now_ms();
        let horizon = self.taken_until_ms;
        let latched = self
            .presses
            .iter()
            .any(|p| p.start_ms <= now && horizon.is_none_or(|h| p.start_ms > h));
        self.taken_until_ms = Some(now);
        latched
    }
}

impl SleepPort for MockHardware {
    fn sleep(&mut self, duration: SleepDuration) {
        self.calls.push(HwCall::Sleep(duration));
        self.advance_ms(duration.as_ms());
    }
}

impl WatchdogPort for MockHardware {
    fn feed(&mut self) {
        self.feeds += 1;
    }
}

impl ClockPort for MockHardware {
    fn now_us(&self) -> u64 {
        self.now_us
    }
}

impl TuneStream for MockHardware {
    fn play(&mut self, tune: Tune, now_us: u64) {
        self.calls.push(HwCall::Play(tune));
        self.tune = Some((tune, now_us));
    }

    fn overlay(&mut self, tune: Tune, _now_us: u64) {
        // The background keeps its own clock underneath the overlay.
        self.calls.push(HwCall::Overlay(tune));
    }

    fn is_playing(&self) -> bool {
        match self.tune {
            Some((tune, started_us)) => match tune_length_ms(tune) {
                Some(len) => self.now_us - started_us < u64::from(len) * 1000,
                None => true,
            },
            None => false,
        }
    }

    fn update(&mut self, _now_us: u64) {
        self.updates += 1;
    }

    fn stop(&mut self) {
        self.calls.push(HwCall::StopTune);
        self.tune = None;
    }
}

impl BoostPort for MockHardware {
    fn set_boost(&mut self, enabled: bool) {
        self.boost = enabled;
        self.calls.push(HwCall::Boost(enabled));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AlarmEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AlarmEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AlarmEvent) {
        self.events.push(*event);
    }
}
