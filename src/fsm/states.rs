//! Concrete alarm state handlers and table builder.
//!
//! Each state is defined by plain `fn` pointers; no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  INIT ──[calibrated]──▶ SLEEP ──[motion]──▶ AWAKE ──[cycles]──▶ ALERT
//!   │                      ▲                                     │
//!   │ [button]             └──────────────[cycles]───────────────┤
//!   ▼                                                            │ [motion]
//!  exit        SLEEP / AWAKE / ALERT ──[button]──▶ COUNTDOWN ◀───┘
//!                                                   │       │
//!                                        [timeout]  ▼       └─[code]─▶ exit
//!                        SLEEP ◀──[timeout]──── SIREN ──[code]──▶ exit
//! ```

use log::{info, warn};

use super::context::{AlarmContext, SensorMode, TuneRequest};
use super::{AlarmStateId, StateDescriptor, Transition};
use crate::app::events::AlarmEvent;
use crate::app::ports::{SleepDuration, Tune};
use crate::code_entry::EntryOutcome;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per alarm run.
pub fn build_state_table() -> [StateDescriptor; AlarmStateId::COUNT] {
    [
        StateDescriptor {
            id: AlarmStateId::Init,
            name: "Init",
            on_enter: Some(init_enter),
            on_exit: None,
            on_update: init_update,
        },
        StateDescriptor {
            id: AlarmStateId::Sleep,
            name: "Sleep",
            on_enter: Some(sleep_enter),
            on_exit: None,
            on_update: sleep_update,
        },
        StateDescriptor {
            id: AlarmStateId::Awake,
            name: "Awake",
            on_enter: Some(awake_enter),
            on_exit: None,
            on_update: awake_update,
        },
        StateDescriptor {
            id: AlarmStateId::Alert,
            name: "Alert",
            on_enter: Some(alert_enter),
            on_exit: None,
            on_update: alert_update,
        },
        StateDescriptor {
            id: AlarmStateId::Countdown,
            name: "Countdown",
            on_enter: Some(countdown_enter),
            on_exit: Some(countdown_exit),
            on_update: countdown_update,
        },
        StateDescriptor {
            id: AlarmStateId::Siren,
            name: "Siren",
            on_enter: Some(siren_enter),
            on_exit: Some(siren_exit),
            on_update: siren_update,
        },
    ]
}

fn watch(ctx: &mut AlarmContext, sensor: SensorMode, sleep: SleepDuration) {
    ctx.commands.sensor = sensor;
    ctx.commands.sleep = sleep;
}

/// Feed this tick's sample (if any) through the detector.
fn moved(ctx: &mut AlarmContext) -> bool {
    match ctx.inputs.sample {
        Some(sample) => ctx.detector.is_moved(sample),
        None => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  INIT: fill the motion windows
// ═══════════════════════════════════════════════════════════════════════════

fn init_enter(ctx: &mut AlarmContext) {
    ctx.detector.reset();
    watch(ctx, SensorMode::Continuous, SleepDuration::Settle);
    info!("INIT: calibrating accelerometer");
}

fn init_update(ctx: &mut AlarmContext) -> Transition {
    if ctx.inputs.cancel {
        info!("INIT: cancelled");
        ctx.raise(AlarmEvent::Cancelled);
        return Transition::Exit;
    }

    if let Some(sample) = ctx.inputs.sample {
        ctx.detector.calibrate(sample);
    }

    if ctx.detector.is_calibrated() {
        ctx.commands.tune = Some(TuneRequest::Play(Tune::Acknowledge));
        ctx.raise(AlarmEvent::Calibrated);
        return Transition::Next(AlarmStateId::Sleep);
    }

    Transition::Stay
}

// ═══════════════════════════════════════════════════════════════════════════
//  SLEEP: pulsed sensor, long naps
// ═══════════════════════════════════════════════════════════════════════════

fn sleep_enter(ctx: &mut AlarmContext) {
    watch(ctx, SensorMode::Pulsed, SleepDuration::Long);
}

fn sleep_update(ctx: &mut AlarmContext) -> Transition {
    if ctx.inputs.cancel {
        return Transition::Next(AlarmStateId::Countdown);
    }
    if moved(ctx) {
        ctx.raise(AlarmEvent::MotionDetected(AlarmStateId::Sleep));
        return Transition::Next(AlarmStateId::Awake);
    }
    Transition::Stay
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAKE: ride out a single bump
// ═══════════════════════════════════════════════════════════════════════════

fn awake_enter(ctx: &mut AlarmContext) {
    watch(ctx, SensorMode::Continuous, SleepDuration::Settle);
}

fn awake_update(ctx: &mut AlarmContext) -> Transition {
    if ctx.inputs.cancel {
        return Transition::Next(AlarmStateId::Countdown);
    }

    // Keep the windows rolling; the verdict is ignored here.
    let _ = moved(ctx);

    if ctx.ticks_in_state >= u64::from(ctx.config.awake_cycles) {
        return Transition::Next(AlarmStateId::Alert);
    }
    Transition::Stay
}

// ═══════════════════════════════════════════════════════════════════════════
//  ALERT: any further motion escalates
// ═══════════════════════════════════════════════════════════════════════════

fn alert_enter(ctx: &mut AlarmContext) {
    watch(ctx, SensorMode::Continuous, SleepDuration::Settle);
}

fn alert_update(ctx: &mut AlarmContext) -> Transition {
    if ctx.inputs.cancel {
        return Transition::Next(AlarmStateId::Countdown);
    }
    if moved(ctx) {
        warn!("ALERT: movement, starting countdown");
        ctx.raise(AlarmEvent::MotionDetected(AlarmStateId::Alert));
        return Transition::Next(AlarmStateId::Countdown);
    }
    if ctx.ticks_in_state >= u64::from(ctx.config.alert_cycles) {
        return Transition::Next(AlarmStateId::Sleep);
    }
    Transition::Stay
}

// ═══════════════════════════════════════════════════════════════════════════
//  COUNTDOWN / SIREN: code entry against a background tune
// ═══════════════════════════════════════════════════════════════════════════

/// Shared code-entry step.  `limit_ms` bounds the wait even if the tune
/// never ends.
fn enter_code(ctx: &mut AlarmContext, limit_ms: u32) -> Option<EntryOutcome> {
    let times_up = !ctx.inputs.tune_playing || ctx.ms_in_state() >= limit_ms;
    let i = ctx.inputs;
    match ctx
        .code_entry
        .play_with_background(i.now_ms, i.horn, i.mode, times_up)
    {
        EntryOutcome::Pending => None,
        EntryOutcome::FailedAttempt => {
            let attempts = ctx.code_entry.attempts();
            ctx.commands.tune = Some(TuneRequest::Overlay(Tune::Error));
            ctx.raise(AlarmEvent::CodeRejected { attempts });
            None
        }
        outcome @ (EntryOutcome::Accepted | EntryOutcome::TimedOut) => {
            if outcome == EntryOutcome::Accepted {
                ctx.raise(AlarmEvent::Disarmed);
            }
            Some(outcome)
        }
    }
}

fn countdown_enter(ctx: &mut AlarmContext) {
    ctx.code_entry.start(ctx.inputs.now_ms);
    ctx.code_entry.reset_attempts();
    ctx.commands.tune = Some(TuneRequest::Play(Tune::Countdown));
    watch(ctx, SensorMode::Off, SleepDuration::Poll);
    info!("COUNTDOWN: waiting for code");
}

fn countdown_update(ctx: &mut AlarmContext) -> Transition {
    let limit = ctx.config.countdown_ms;
    match enter_code(ctx, limit) {
        Some(EntryOutcome::Accepted) => Transition::Exit,
        Some(_) => Transition::Next(AlarmStateId::Siren),
        None => Transition::Stay,
    }
}

fn countdown_exit(ctx: &mut AlarmContext) {
    ctx.commands.tune = Some(TuneRequest::Stop);
}

fn siren_enter(ctx: &mut AlarmContext) {
    // Code entry carries on from the countdown: a code started just
    // before the deadline can still be finished.
    ctx.commands.boost = Some(true);
    ctx.commands.tune = Some(TuneRequest::Play(Tune::Warble));
    watch(ctx, SensorMode::Off, SleepDuration::Poll);
    warn!("SIREN: sounding");
}

fn siren_update(ctx: &mut AlarmContext) -> Transition {
    let limit = ctx.config.siren_ms;
    match enter_code(ctx, limit) {
        Some(EntryOutcome::Accepted) => Transition::Exit,
        Some(_) => {
            info!("SIREN: timed out, re-arming");
            Transition::Next(AlarmStateId::Sleep)
        }
        None => Transition::Stay,
    }
}

fn siren_exit(ctx: &mut AlarmContext) {
    ctx.commands.tune = Some(TuneRequest::Stop);
    ctx.commands.boost = Some(false);
}
