//! Shared mutable context threaded through every alarm state handler.
//!
//! `AlarmContext` is the single struct that state handlers read from and
//! write to: the per-tick input snapshot, the commands for the service to
//! apply, the motion detector and code entry session, timing, and config.
//! Think of it as the "blackboard" in a blackboard architecture.

use heapless::Vec;
use log::warn;

use crate::app::events::AlarmEvent;
use crate::app::ports::{SleepDuration, Tune};
use crate::code_entry::CodeEntry;
use crate::config::AlarmConfig;
use crate::motion::MotionDetector;

// ---------------------------------------------------------------------------
// Inputs (written by the service before each tick)
// ---------------------------------------------------------------------------

/// Everything a state may look at during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmInputs {
    /// Wrapping millisecond clock.
    pub now_ms: u32,
    /// Horn button level.
    pub horn: bool,
    /// Mode button level.
    pub mode: bool,
    /// A button went down since the previous tick.
    pub cancel: bool,
    /// Accelerometer reading, if the sensor was sampled this tick.
    pub sample: Option<[i16; 3]>,
    /// The background tune has not finished.
    pub tune_playing: bool,
}

// ---------------------------------------------------------------------------
// Commands (written by state handlers; applied by the service)
// ---------------------------------------------------------------------------

/// How the service drives the accelerometer between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorMode {
    /// Powered down, never sampled.
    Off,
    /// Powered; one sample after each sleep.
    Continuous,
    /// Powered down for a long sleep, powered up to settle, then sampled.
    Pulsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneRequest {
    Play(Tune),
    Overlay(Tune),
    Stop,
}

/// `sensor` and `sleep` persist until a state changes them; `tune` and
/// `boost` are one-shot and cleared at the start of every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmCommands {
    pub sensor: SensorMode,
    pub sleep: SleepDuration,
    pub tune: Option<TuneRequest>,
    pub boost: Option<bool>,
}

impl Default for AlarmCommands {
    fn default() -> Self {
        Self {
            sensor: SensorMode::Off,
            sleep: SleepDuration::Poll,
            tune: None,
            boost: None,
        }
    }
}

/// Upper bound on events raised in one tick (exit + enter + one outcome).
pub const MAX_TICK_EVENTS: usize = 4;

// ---------------------------------------------------------------------------
// AlarmContext
// ---------------------------------------------------------------------------

pub struct AlarmContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
    /// `inputs.now_ms` at the moment the current state was entered.
    pub state_entered_ms: u32,

    pub inputs: AlarmInputs,
    pub commands: AlarmCommands,

    // -- Domain --
    pub detector: MotionDetector,
    pub code_entry: CodeEntry,

    pub config: AlarmConfig,

    /// Domain events raised this tick, drained by the service.
    pub events: Vec<AlarmEvent, MAX_TICK_EVENTS>,
}

impl AlarmContext {
    pub fn new(config: AlarmConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            state_entered_ms: 0,
            inputs: AlarmInputs::default(),
            commands: AlarmCommands::default(),
            detector: MotionDetector::new(config.std_deviations),
            code_entry: CodeEntry::new(config.pin_code, config.debounce_ms),
            config,
            events: Vec::new(),
        }
    }

    /// Load this tick's inputs and clear the one-shot commands.
    pub fn begin_tick(&mut self, inputs: AlarmInputs) {
        self.inputs = inputs;
        self.commands.tune = None;
        self.commands.boost = None;
        self.events.clear();
    }

    /// Milliseconds since the current state was entered.
    pub fn ms_in_state(&self) -> u32 {
        self.inputs.now_ms.wrapping_sub(self.state_entered_ms)
    }

    pub fn raise(&mut self, event: AlarmEvent) {
        if let Err(dropped) = self.events.push(event) {
            warn!("alarm event dropped: {:?}", dropped);
        }
    }
}
