//! End-to-end tests for the burglar alarm: AlarmService → FSM → ports.
//!
//! Every scenario starts from a fresh service on [`MockHardware`] and
//! drives it tick by tick, so the timing is exactly what the firmware
//! would see with the default sleep durations.

use crate::mock_hw::{HwCall, MockHardware, RecordingSink};

use bikehorn::app::events::AlarmEvent;
use bikehorn::app::ports::{Button, ClockPort, SleepDuration, Tune};
use bikehorn::app::service::AlarmService;
use bikehorn::config::AlarmConfig;
use bikehorn::fsm::AlarmStateId;
use bikehorn::motion::CALIBRATION_SAMPLES;

/// Default PIN `1001011`, horn = true.
const PIN: [bool; 7] = [true, false, false, true, false, true, true];
const WRONG: [bool; 7] = [false; 7];

fn config() -> AlarmConfig {
    AlarmConfig {
        siren_ms: 3_000,
        ..AlarmConfig::default()
    }
}

fn started() -> (AlarmService, MockHardware, RecordingSink) {
    let mut app = AlarmService::new(config());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut sink);
    (app, hw, sink)
}

/// Tick until `pred` holds.  Returns the number of ticks taken.
fn tick_until(
    app: &mut AlarmService,
    hw: &mut MockHardware,
    sink: &mut RecordingSink,
    max_ticks: u32,
    pred: impl Fn(&AlarmService) -> bool,
) -> u32 {
    for n in 1..=max_ticks {
        app.tick(hw, sink);
        if pred(app) {
            return n;
        }
    }
    panic!(
        "condition not reached in {} ticks (state {:?})",
        max_ticks,
        app.state()
    );
}

fn in_state(state: AlarmStateId) -> impl Fn(&AlarmService) -> bool {
    move |app| app.state() == Some(state)
}

fn armed() -> (AlarmService, MockHardware, RecordingSink) {
    let (mut app, mut hw, mut sink) = started();
    tick_until(&mut app, &mut hw, &mut sink, 40, in_state(AlarmStateId::Sleep));
    (app, hw, sink)
}

fn countdown_by_button() -> (AlarmService, MockHardware, RecordingSink) {
    let (mut app, mut hw, mut sink) = armed();
    hw.press(Button::Mode, 100, 50);
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(AlarmStateId::Countdown));
    (app, hw, sink)
}

fn alert() -> (AlarmService, MockHardware, RecordingSink) {
    let (mut app, mut hw, mut sink) = armed();
    hw.shake_next(400);
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(AlarmStateId::Awake));
    tick_until(&mut app, &mut hw, &mut sink, 20, in_state(AlarmStateId::Alert));
    (app, hw, sink)
}

fn changed(from: AlarmStateId, to: AlarmStateId) -> AlarmEvent {
    AlarmEvent::StateChanged { from, to: Some(to) }
}

// ── Calibration ───────────────────────────────────────────────

#[test]
fn calibration_arms_after_a_full_window() {
    let (mut app, mut hw, mut sink) = started();
    assert_eq!(app.state(), Some(AlarmStateId::Init));
    assert!(hw.powered, "sensor powered for calibration");

    let ticks = tick_until(&mut app, &mut hw, &mut sink, 40, in_state(AlarmStateId::Sleep));

    assert_eq!(ticks as usize, CALIBRATION_SAMPLES);
    assert!(sink.contains(&AlarmEvent::Started(AlarmStateId::Init)));
    assert!(sink.contains(&AlarmEvent::Calibrated));
    assert!(sink.contains(&changed(AlarmStateId::Init, AlarmStateId::Sleep)));
    assert!(hw.calls.contains(&HwCall::Play(Tune::Acknowledge)));
    assert_eq!(hw.count(HwCall::Sleep(SleepDuration::Settle)), CALIBRATION_SAMPLES);
}

#[test]
fn launching_press_does_not_cancel() {
    let mut app = AlarmService::new(config());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    // Still latched from the menu selection.
    hw.press(Button::Mode, 0, 50);
    app.start(&mut hw, &mut sink);

    tick_until(&mut app, &mut hw, &mut sink, 40, in_state(AlarmStateId::Sleep));
    assert!(!sink.contains(&AlarmEvent::Cancelled));
}

#[test]
fn press_during_calibration_cancels() {
    let (mut app, mut hw, mut sink) = started();
    app.tick(&mut hw, &mut sink);
    hw.press(Button::Horn, 100, 50);

    assert!(!app.tick(&mut hw, &mut sink), "cancel ends the session");
    assert!(app.is_finished());
    assert!(sink.contains(&AlarmEvent::Cancelled));
    assert_eq!(sink.events.last(), Some(&AlarmEvent::Stopped));
    assert!(!hw.powered);
}

// ── Sleep / Awake / Alert ─────────────────────────────────────

#[test]
fn sleep_never_leaves_without_motion() {
    let (mut app, mut hw, mut sink) = armed();
    hw.clear_calls();

    for _ in 0..60 {
        assert!(app.tick(&mut hw, &mut sink));
        assert_eq!(app.state(), Some(AlarmStateId::Sleep));
    }
    // Pulsed: off for the long nap, on to settle and sample.
    assert_eq!(hw.count(HwCall::Sleep(SleepDuration::Long)), 60);
    assert_eq!(hw.count(HwCall::PowerOn), 60);
    assert_eq!(hw.count(HwCall::PowerOff), 60);
}

#[test]
fn motion_wakes_then_relaxes_back_to_sleep() {
    let (mut app, mut hw, mut sink) = alert();
    assert!(sink.contains(&AlarmEvent::MotionDetected(AlarmStateId::Sleep)));
    assert!(sink.contains(&changed(AlarmStateId::Sleep, AlarmStateId::Awake)));
    assert!(sink.contains(&changed(AlarmStateId::Awake, AlarmStateId::Alert)));

    let ticks = tick_until(&mut app, &mut hw, &mut sink, 400, in_state(AlarmStateId::Sleep));

    assert_eq!(ticks, config().alert_cycles);
    assert!(sink.contains(&changed(AlarmStateId::Alert, AlarmStateId::Sleep)));
    assert!(!hw.calls.contains(&HwCall::Play(Tune::Countdown)));
}

#[test]
fn awake_ignores_the_motion_that_woke_it() {
    let (mut app, mut hw, mut sink) = armed();
    hw.shake_next(400);
    app.tick(&mut hw, &mut sink);

    hw.shake_next(400);
    let ticks = tick_until(&mut app, &mut hw, &mut sink, 20, in_state(AlarmStateId::Alert));
    assert_eq!(ticks, config().awake_cycles);
}

#[test]
fn motion_during_alert_starts_countdown() {
    let (mut app, mut hw, mut sink) = alert();
    hw.shake_next(2_000);
    app.tick(&mut hw, &mut sink);

    assert_eq!(app.state(), Some(AlarmStateId::Countdown));
    assert!(sink.contains(&AlarmEvent::MotionDetected(AlarmStateId::Alert)));
    assert_eq!(hw.current_tune(), Some(Tune::Countdown));
    assert!(!hw.powered, "sensor off while the owner types");
}

#[test]
fn button_in_sleep_starts_countdown() {
    let (app, hw, sink) = countdown_by_button();
    assert!(sink.contains(&changed(AlarmStateId::Sleep, AlarmStateId::Countdown)));
    assert!(!sink.events.iter().any(|e| matches!(e, AlarmEvent::MotionDetected(_))));
    assert_eq!(hw.current_tune(), Some(Tune::Countdown));
    assert_eq!(app.context().code_entry.attempts(), 0);
}

#[test]
fn button_in_awake_or_alert_starts_countdown() {
    let (mut app, mut hw, mut sink) = armed();
    hw.shake_next(400);
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(AlarmStateId::Awake));
    hw.press(Button::Horn, 100, 50);
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(AlarmStateId::Countdown));

    let (mut app, mut hw, mut sink) = alert();
    hw.press(Button::Mode, 100, 50);
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(AlarmStateId::Countdown));
    assert!(sink.contains(&changed(AlarmStateId::Alert, AlarmStateId::Countdown)));
}

// ── Countdown ─────────────────────────────────────────────────

#[test]
fn correct_code_in_countdown_disarms() {
    let (mut app, mut hw, mut sink) = countdown_by_button();
    hw.enter_code(20, &PIN);

    tick_until(&mut app, &mut hw, &mut sink, 500, AlarmService::is_finished);

    assert!(sink.contains(&AlarmEvent::Disarmed));
    assert_eq!(sink.events.last(), Some(&AlarmEvent::Stopped));
    assert!(!sink.contains(&changed(AlarmStateId::Countdown, AlarmStateId::Siren)));
    assert!(!hw.calls.contains(&HwCall::Boost(true)));
    assert_eq!(hw.current_tune(), None);
    assert!(!hw.powered);
}

#[test]
fn wrong_code_beeps_and_allows_retry() {
    let (mut app, mut hw, mut sink) = countdown_by_button();
    let done = hw.enter_code(20, &WRONG);
    while hw.now_ms() < done + 100 {
        app.tick(&mut hw, &mut sink);
    }

    assert_eq!(app.state(), Some(AlarmStateId::Countdown));
    assert!(sink.contains(&AlarmEvent::CodeRejected { attempts: 1 }));
    assert_eq!(hw.count(HwCall::Overlay(Tune::Error)), 1);

    hw.enter_code(20, &PIN);
    tick_until(&mut app, &mut hw, &mut sink, 500, AlarmService::is_finished);
    assert!(sink.contains(&AlarmEvent::Disarmed));
}

#[test]
fn countdown_timeout_sounds_siren() {
    let (mut app, mut hw, mut sink) = countdown_by_button();
    let entered_ms = hw.now_ms();

    tick_until(&mut app, &mut hw, &mut sink, 2_000, in_state(AlarmStateId::Siren));

    assert!(hw.now_ms() - entered_ms >= config().countdown_ms);
    assert!(hw.boost);
    assert_eq!(hw.current_tune(), Some(Tune::Warble));
    assert!(sink.contains(&changed(AlarmStateId::Countdown, AlarmStateId::Siren)));
}

// ── Siren ─────────────────────────────────────────────────────

#[test]
fn correct_code_silences_siren_and_exits() {
    let mut app = AlarmService::new(config());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    app.start_from(AlarmStateId::Siren, &mut hw, &mut sink);
    assert!(hw.boost);
    assert_eq!(hw.current_tune(), Some(Tune::Warble));

    hw.enter_code(20, &PIN);
    tick_until(&mut app, &mut hw, &mut sink, 500, AlarmService::is_finished);

    assert!(sink.contains(&AlarmEvent::Disarmed));
    assert!(!hw.boost);
    assert_eq!(hw.calls.last(), Some(&HwCall::StopTune));
    assert_eq!(hw.current_tune(), None);
}

#[test]
fn stop_hands_the_converter_back_running() {
    let mut app = AlarmService::new(config());
    app.set_resting_boost(true);
    let mut hw = MockHardware::new();
    hw.boost = true;
    let mut sink = RecordingSink::new();
    app.start_from(AlarmStateId::Siren, &mut hw, &mut sink);
    assert!(!hw.calls.contains(&HwCall::Boost(true)));

    hw.enter_code(20, &PIN);
    tick_until(&mut app, &mut hw, &mut sink, 500, AlarmService::is_finished);

    let boosts: Vec<_> = hw
        .calls
        .iter()
        .filter(|c| matches!(c, HwCall::Boost(_)))
        .copied()
        .collect();
    assert_eq!(boosts, [HwCall::Boost(false), HwCall::Boost(true)]);
    assert!(hw.boost);
}

#[test]
fn siren_timeout_rearms_silently() {
    let (mut app, mut hw, mut sink) = countdown_by_button();
    tick_until(&mut app, &mut hw, &mut sink, 2_000, in_state(AlarmStateId::Siren));
    let siren_ms = hw.now_ms();

    tick_until(&mut app, &mut hw, &mut sink, 1_000, in_state(AlarmStateId::Sleep));

    assert!(hw.now_ms() - siren_ms >= config().siren_ms);
    assert!(!hw.boost);
    assert_eq!(hw.current_tune(), None);
    assert!(!sink.contains(&AlarmEvent::Disarmed));

    // Re-armed: still bike stays asleep.
    for _ in 0..10 {
        app.tick(&mut hw, &mut sink);
    }
    assert_eq!(app.state(), Some(AlarmStateId::Sleep));
}

// ── Housekeeping ──────────────────────────────────────────────

#[test]
fn watchdog_fed_every_tick() {
    let (mut app, mut hw, mut sink) = armed();
    for _ in 0..5 {
        app.tick(&mut hw, &mut sink);
    }
    assert_eq!(u64::from(hw.feeds), app.tick_count());
}

#[test]
fn stop_is_idempotent() {
    let (mut app, mut hw, mut sink) = countdown_by_button();
    hw.enter_code(20, &PIN);
    tick_until(&mut app, &mut hw, &mut sink, 500, AlarmService::is_finished);

    app.stop(&mut hw, &mut sink);
    assert!(!app.tick(&mut hw, &mut sink));
    let stopped = sink
        .events
        .iter()
        .filter(|e| **e == AlarmEvent::Stopped)
        .count();
    assert_eq!(stopped, 1);
}

#[test]
fn run_returns_once_cancelled() {
    let mut app = AlarmService::new(config());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    // Cancel arrives during calibration.
    hw.press(Button::Mode, 600, 50);

    app.run(&mut hw, &mut sink);

    assert!(app.is_finished());
    assert!(sink.contains(&AlarmEvent::Cancelled));
}
