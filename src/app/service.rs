//! Application service: the hexagonal core of the burglar alarm.
//!
//! [`AlarmService`] owns the FSM and its context.  It exposes a clean,
//! hardware-agnostic API.  All I/O flows through port traits injected at
//! call sites, making the entire alarm testable with mock adapters.
//!
//! ```text
//!  Accelerometer ─┐                           ┌──▶ EventSink
//!  Buttons ───────┤   ┌───────────────────┐   │
//!  Clock ─────────┼──▶│   AlarmService     │───┤
//!  Sleep/Watchdog ┤   │  FSM · Detector ·  │   ├──▶ TuneStream
//!                 │   │  CodeEntry         │   └──▶ Boost
//!                 └── └───────────────────┘
//! ```
//!
//! One tick:
//!
//! 1. feed the watchdog
//! 2. sleep (and pulse / sample the accelerometer) per the sensor mode
//! 3. snapshot clock and buttons, advance the background tune
//! 4. tick the FSM
//! 5. apply tune / boost / sensor-power commands, emit events

use log::info;

use crate::config::AlarmConfig;
use crate::fsm::context::{AlarmContext, AlarmInputs, SensorMode, TuneRequest};
use crate::fsm::states::build_state_table;
use crate::fsm::{AlarmStateId, Fsm};

use super::events::AlarmEvent;
use super::ports::{AlarmPorts, Button, EventSink, SleepDuration};

// ───────────────────────────────────────────────────────────────
// AlarmService
// ───────────────────────────────────────────────────────────────

pub struct AlarmService {
    fsm: Fsm,
    ctx: AlarmContext,
    sensor_powered: bool,
    boost_on: bool,
    /// Boost level the caller runs at; the alarm starts from it and hands it back.
    resting_boost: bool,
    tick_count: u64,
    stopped: bool,
}

impl AlarmService {
    /// Does **not** start the FSM; call [`start`](Self::start) or
    /// [`run`](Self::run) next.
    pub fn new(config: AlarmConfig) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), AlarmStateId::Init),
            ctx: AlarmContext::new(config),
            sensor_powered: false,
            boost_on: false,
            resting_boost: false,
            tick_count: 0,
            stopped: false,
        }
    }

    /// Declare that the boost converter is already running when the alarm
    /// starts.  [`stop`](Self::stop) leaves it running again.
    pub fn set_resting_boost(&mut self, enabled: bool) {
        self.resting_boost = enabled;
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter `Init`.
    pub fn start(&mut self, hw: &mut impl AlarmPorts, sink: &mut impl EventSink) {
        self.start_from(AlarmStateId::Init, hw, sink);
    }

    /// Start the FSM and immediately jump to `state` (bench testing a
    /// single stage without walking through calibration).
    pub fn start_from(
        &mut self,
        state: AlarmStateId,
        hw: &mut impl AlarmPorts,
        sink: &mut impl EventSink,
    ) {
        // The press that launched the alarm must not cancel it.
        let _ = hw.take_press();
        self.ctx.begin_tick(AlarmInputs {
            now_ms: hw.now_ms(),
            tune_playing: hw.is_playing(),
            ..AlarmInputs::default()
        });
        self.fsm.start(&mut self.ctx);
        self.fsm.force_transition(state, &mut self.ctx);
        self.stopped = false;
        self.boost_on = self.resting_boost;
        sink.emit(&AlarmEvent::Started(state));
        info!("AlarmService started in {:?}", state);
        let now_us = hw.now_us();
        self.apply_commands(hw, now_us, sink);
    }

    /// Run one full cycle.  Returns `false` once the alarm has finished.
    pub fn tick(&mut self, hw: &mut impl AlarmPorts, sink: &mut impl EventSink) -> bool {
        if self.fsm.is_finished() {
            self.stop(hw, sink);
            return false;
        }
        self.tick_count += 1;
        let prev_state = self.fsm.current_state();

        // 1. Watchdog
        hw.feed();

        // 2. Sleep and sample
        let sample = self.sleep_and_sample(hw);

        // 3. Inputs
        let now_us = hw.now_us();
        let horn = hw.is_pressed(Button::Horn);
        let mode = hw.is_pressed(Button::Mode);
        let cancel = hw.take_press();
        hw.update(now_us);
        let inputs = AlarmInputs {
            now_ms: (now_us / 1000) as u32,
            horn,
            mode,
            cancel,
            sample,
            tune_playing: hw.is_playing(),
        };

        // 4. FSM tick
        self.ctx.begin_tick(inputs);
        self.fsm.tick(&mut self.ctx);

        // 5. Outputs
        self.apply_commands(hw, now_us, sink);

        let new_state = self.fsm.current_state();
        if new_state != prev_state
            && let Some(from) = prev_state
        {
            sink.emit(&AlarmEvent::StateChanged {
                from,
                to: new_state,
            });
        }

        if self.fsm.is_finished() {
            self.stop(hw, sink);
            return false;
        }
        true
    }

    /// Start and tick until disarmed or cancelled.
    pub fn run(&mut self, hw: &mut impl AlarmPorts, sink: &mut impl EventSink) {
        self.start(hw, sink);
        while self.tick(hw, sink) {}
    }

    /// Power the sensor down, silence the tune and put the boost converter
    /// back at its resting level.  Idempotent.
    pub fn stop(&mut self, hw: &mut impl AlarmPorts, sink: &mut impl EventSink) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        hw.power_off();
        self.sensor_powered = false;
        hw.stop();
        if self.boost_on != self.resting_boost {
            hw.set_boost(self.resting_boost);
            self.boost_on = self.resting_boost;
        }
        sink.emit(&AlarmEvent::Stopped);
        info!("AlarmService stopped after {} ticks", self.tick_count);
    }

    // ── Queries ───────────────────────────────────────────────

    /// `None` once the alarm has exited.
    pub fn state(&self) -> Option<AlarmStateId> {
        self.fsm.current_state()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn context(&self) -> &AlarmContext {
        &self.ctx
    }

    pub fn is_finished(&self) -> bool {
        self.fsm.is_finished()
    }

    // ── Internal ──────────────────────────────────────────────

    fn sleep_and_sample(&mut self, hw: &mut impl AlarmPorts) -> Option<[i16; 3]> {
        match self.ctx.commands.sensor {
            SensorMode::Off => {
                hw.sleep(self.ctx.commands.sleep);
                None
            }
            SensorMode::Continuous => {
                self.power_sensor(hw, true);
                hw.sleep(self.ctx.commands.sleep);
                Some(hw.sample())
            }
            SensorMode::Pulsed => {
                self.power_sensor(hw, false);
                hw.sleep(SleepDuration::Long);
                self.power_sensor(hw, true);
                hw.sleep(SleepDuration::Settle);
                Some(hw.sample())
            }
        }
    }

    fn power_sensor(&mut self, hw: &mut impl AlarmPorts, on: bool) {
        if on == self.sensor_powered {
            return;
        }
        if on {
            hw.power_on();
        } else {
            hw.power_off();
        }
        self.sensor_powered = on;
    }

    /// Translate FSM commands into port calls and forward domain events.
    fn apply_commands(&mut self, hw: &mut impl AlarmPorts, now_us: u64, sink: &mut impl EventSink) {
        let cmds = self.ctx.commands;

        if let Some(on) = cmds.boost
            && on != self.boost_on
        {
            hw.set_boost(on);
            self.boost_on = on;
        }

        match cmds.tune {
            Some(TuneRequest::Play(tune)) => hw.play(tune, now_us),
            Some(TuneRequest::Overlay(tune)) => hw.overlay(tune, now_us),
            Some(TuneRequest::Stop) => hw.stop(),
            None => {}
        }

        match cmds.sensor {
            SensorMode::Off => self.power_sensor(hw, false),
            SensorMode::Continuous => self.power_sensor(hw, true),
            // Powered per sample.
            SensorMode::Pulsed => {}
        }

        for event in self.ctx.events.iter() {
            sink.emit(event);
        }
        self.ctx.events.clear();
    }
}
