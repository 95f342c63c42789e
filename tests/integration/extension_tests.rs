//! The built-in extensions as installed in the horn: registry wiring, a
//! full arm → trip → disarm session launched from the mode button, and SOS.

use crate::mock_hw::{HwCall, MockHardware, RecordingSink};

use bikehorn::app::events::AlarmEvent;
use bikehorn::app::horn::{HornAction, HornLoop, LONG_PRESS_MS};
use bikehorn::app::ports::{Button, ClockPort, Tune};
use bikehorn::code_entry::encode_code;
use bikehorn::config::AlarmConfig;
use bikehorn::extensions::burglar_alarm::BurglarAlarmExtension;
use bikehorn::extensions::sos::SosExtension;
use bikehorn::extensions::{ExtensionError, ExtensionRegistry, MenuEntry};
use bikehorn::fsm::AlarmStateId;

const PIN: [bool; 7] = [true, false, false, true, false, true, true];

/// Step the horn until a menu action has run.
fn run_menu<const N: usize>(
    horn: &mut HornLoop,
    hw: &mut MockHardware,
    reg: &mut ExtensionRegistry<'_, MockHardware, N>,
) {
    for _ in 0..2_000 {
        if horn.step(hw, reg) == HornAction::MenuRan {
            return;
        }
    }
    panic!("menu action never ran");
}

/// Long-press mode from now: runs the selected item on release.
fn launch(hw: &mut MockHardware) {
    hw.press(Button::Mode, 0, LONG_PRESS_MS + 100);
}

#[test]
fn burglar_alarm_registers_one_menu_item() {
    let mut alarm = BurglarAlarmExtension::new(AlarmConfig::default(), RecordingSink::new());
    let mut reg: ExtensionRegistry<'_, MockHardware, 1> = ExtensionRegistry::new();
    reg.register(&mut alarm).unwrap();

    assert_eq!(reg.names().collect::<Vec<_>>(), ["burglar-alarm"]);
    assert_eq!(reg.menu_len(), 1);
    assert_eq!(
        reg.menu_entry(0),
        Some(MenuEntry {
            extension: 0,
            local: 0,
            label: "Burglar alarm",
        })
    );
    assert_eq!(reg.menu_entry(1), None);
}

#[test]
fn full_registry_is_reported() {
    let mut a = BurglarAlarmExtension::new(AlarmConfig::default(), RecordingSink::new());
    let mut b = BurglarAlarmExtension::new(AlarmConfig::default(), RecordingSink::new());
    let mut reg: ExtensionRegistry<'_, MockHardware, 1> = ExtensionRegistry::new();
    reg.register(&mut a).unwrap();
    assert_eq!(
        reg.register(&mut b),
        Err(ExtensionError::RegistryFull { capacity: 1 })
    );
}

#[test]
fn cancelled_session_returns_to_the_horn() {
    let mut hw = MockHardware::new();
    let mut alarm = BurglarAlarmExtension::new(AlarmConfig::default(), RecordingSink::new());
    {
        let mut reg: ExtensionRegistry<'_, MockHardware, 1> = ExtensionRegistry::new();
        reg.register(&mut alarm).unwrap();
        let mut horn = HornLoop::new(hw.now_ms());
        horn.start(&mut hw, &mut reg);

        launch(&mut hw);
        // Cancel while calibrating.
        hw.press(Button::Mode, LONG_PRESS_MS + 800, 50);
        run_menu(&mut horn, &mut hw, &mut reg);

        // The horn is usable again.
        hw.press(Button::Horn, 0, 100);
        assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Sounding);
    }
    assert_eq!(alarm.runs(), 1);
    assert!(alarm.sink().contains(&AlarmEvent::Cancelled));
    assert!(!hw.powered);
    assert!(hw.boost);
}

#[test]
fn armed_bike_trips_and_owner_disarms() {
    let mut hw = MockHardware::new();
    let mut alarm = BurglarAlarmExtension::new(AlarmConfig::default(), RecordingSink::new());
    {
        let mut reg: ExtensionRegistry<'_, MockHardware, 1> = ExtensionRegistry::new();
        reg.register(&mut alarm).unwrap();
        let mut horn = HornLoop::new(hw.now_ms());
        horn.start(&mut hw, &mut reg);

        // Launch, then (once armed ~4.25 s after release) the owner comes
        // back, presses a button and types the PIN.
        launch(&mut hw);
        hw.press(Button::Horn, 7_000, 50);
        hw.enter_code(9_000, &PIN);

        run_menu(&mut horn, &mut hw, &mut reg);
    }
    assert_eq!(alarm.runs(), 1);

    let events = &alarm.sink().events;
    let sleep_to_countdown = AlarmEvent::StateChanged {
        from: AlarmStateId::Sleep,
        to: Some(AlarmStateId::Countdown),
    };
    assert!(events.contains(&AlarmEvent::Calibrated));
    assert!(events.contains(&sleep_to_countdown));
    assert!(events.contains(&AlarmEvent::Disarmed));
    assert_eq!(events.last(), Some(&AlarmEvent::Stopped));
    assert!(hw.calls.contains(&HwCall::Play(Tune::Countdown)));
    // The horn's converter is left running throughout.
    assert!(!hw.calls.contains(&HwCall::Boost(false)));
    assert!(hw.boost);
    assert!(!hw.powered);
}

#[test]
fn config_changes_apply_to_the_next_session() {
    let mut alarm = BurglarAlarmExtension::new(AlarmConfig::default(), RecordingSink::new());
    alarm
        .set_config(AlarmConfig {
            countdown_ms: 1_000,
            ..AlarmConfig::default()
        })
        .unwrap();
    let mut hw = MockHardware::new();
    {
        let mut reg: ExtensionRegistry<'_, MockHardware, 1> = ExtensionRegistry::new();
        reg.register(&mut alarm).unwrap();
        let mut horn = HornLoop::new(hw.now_ms());
        horn.start(&mut hw, &mut reg);

        launch(&mut hw);
        hw.press(Button::Horn, 7_000, 50);
        // Short countdown expires, then the PIN silences the siren.
        hw.enter_code(11_000, &PIN);
        run_menu(&mut horn, &mut hw, &mut reg);
    }
    let events = &alarm.sink().events;
    assert!(events.contains(&AlarmEvent::StateChanged {
        from: AlarmStateId::Countdown,
        to: Some(AlarmStateId::Siren),
    }));
    assert!(events.contains(&AlarmEvent::Disarmed));

    // Siren exit drops the converter; leaving the alarm hands it back on.
    let boosts: Vec<_> = hw
        .calls
        .iter()
        .filter(|c| matches!(c, HwCall::Boost(_)))
        .copied()
        .collect();
    assert_eq!(
        boosts,
        [HwCall::Boost(true), HwCall::Boost(false), HwCall::Boost(true)]
    );
    assert!(hw.boost);
}

#[test]
fn unusable_pin_is_refused() {
    let mut alarm = BurglarAlarmExtension::new(AlarmConfig::default(), RecordingSink::new());
    let empty_pin = AlarmConfig {
        pin_code: encode_code(0, 0),
        ..AlarmConfig::default()
    };
    assert!(alarm.set_config(empty_pin).is_err());
    assert_eq!(alarm.config(), &AlarmConfig::default());

    let built = BurglarAlarmExtension::new(empty_pin, RecordingSink::new());
    assert_eq!(built.config(), &AlarmConfig::default());
}

#[test]
fn sos_plays_until_a_long_mode_press() {
    let mut hw = MockHardware::new();
    let mut alarm = BurglarAlarmExtension::new(AlarmConfig::default(), RecordingSink::new());
    let mut sos = SosExtension::new();
    let base_ms = hw.now_ms();
    {
        let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
        reg.register(&mut alarm).unwrap();
        reg.register(&mut sos).unwrap();
        assert_eq!(reg.menu_entry(1).map(|e| e.label), Some("SOS"));
        let mut horn = HornLoop::new(hw.now_ms());
        horn.start(&mut hw, &mut reg);

        // Short press to reach "SOS", long press to run it.
        hw.press(Button::Mode, 0, 100);
        hw.press(Button::Mode, 500, LONG_PRESS_MS + 100);
        // A short press does not stop it; a long one does.
        hw.press(Button::Mode, 3_000, 100);
        hw.press(Button::Mode, 5_000, LONG_PRESS_MS + 200);
        run_menu(&mut horn, &mut hw, &mut reg);
        assert_eq!(horn.selected(), 0);
    }
    assert_eq!(sos.runs(), 1);
    assert_eq!(alarm.runs(), 0);
    assert!(hw.now_ms() - base_ms >= 5_000 + LONG_PRESS_MS + 200);

    let play = hw
        .calls
        .iter()
        .position(|c| *c == HwCall::Play(Tune::Sos))
        .expect("SOS never played");
    assert_eq!(hw.calls[play - 1], HwCall::Boost(true));
    assert_eq!(hw.calls.last(), Some(&HwCall::StopTune));
    assert_eq!(hw.current_tune(), None);
    assert!(hw.updates > 100);
    assert!(hw.feeds > 100);
    assert!(hw.boost);
}
