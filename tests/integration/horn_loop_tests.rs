//! Tests for the horn super-loop: horn button → warble, mode button → menu,
//! idle naps, and the extension hooks fired around each.

use crate::mock_hw::{HwCall, MockHardware};

use bikehorn::app::horn::{HornAction, HornLoop, IDLE_SLEEP_MS, LONG_PRESS_MS, MENU_TIMEOUT_MS};
use bikehorn::app::ports::{Button, ClockPort, SleepDuration, Tune};
use bikehorn::extensions::{Extension, ExtensionRegistry};

/// Writes every hook it receives into the mock's notes.
struct Recorder {
    items: &'static [&'static str],
}

impl Recorder {
    fn new() -> Self {
        Self { items: &["Record"] }
    }

    fn with_items(items: &'static [&'static str]) -> Self {
        Self { items }
    }
}

impl Extension<MockHardware> for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn on_start(&mut self, hw: &mut MockHardware) {
        hw.notes.push("start".into());
    }

    fn on_wake(&mut self, hw: &mut MockHardware) {
        hw.notes.push("wake".into());
    }

    fn on_sleep(&mut self, hw: &mut MockHardware) {
        hw.notes.push("sleep".into());
    }

    fn on_tune_start(&mut self, hw: &mut MockHardware) {
        // Fired before the warble is requested.
        assert_eq!(hw.current_tune(), None);
        hw.notes.push("tune_start".into());
    }

    fn on_tune_stop(&mut self, hw: &mut MockHardware) {
        assert_eq!(hw.current_tune(), None);
        hw.notes.push("tune_stop".into());
    }

    fn menu_items(&self) -> &'static [&'static str] {
        self.items
    }

    fn run_menu_item(&mut self, index: usize, hw: &mut MockHardware) {
        hw.notes.push(format!("menu {}", index));
        // Blocking actions take real time.
        hw.advance_ms(500);
    }
}

fn notes(hw: &MockHardware) -> Vec<&str> {
    hw.notes.iter().map(String::as_str).collect()
}

/// Step until `want` comes back; every other action must be `Idle`.
fn step_until<const N: usize>(
    horn: &mut HornLoop,
    hw: &mut MockHardware,
    reg: &mut ExtensionRegistry<'_, MockHardware, N>,
    want: HornAction,
) {
    for _ in 0..2_000 {
        match horn.step(hw, reg) {
            a if a == want => return,
            HornAction::Idle => {}
            other => panic!("expected {:?}, got {:?}", want, other),
        }
    }
    panic!("never got {:?}", want);
}

fn long_press(hw: &mut MockHardware) {
    hw.press(Button::Mode, 0, LONG_PRESS_MS + 100);
}

fn short_press(hw: &mut MockHardware) {
    hw.press(Button::Mode, 0, 100);
}

#[test]
fn horn_button_sounds_warble_while_held() {
    let mut hw = MockHardware::new();
    let mut recorder = Recorder::new();
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    reg.register(&mut recorder).unwrap();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);

    hw.press(Button::Horn, 0, 100);
    assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Sounding);
    assert!(horn.is_sounding());
    assert_eq!(hw.current_tune(), Some(Tune::Warble));

    for _ in 0..5 {
        hw.advance_ms(10);
        assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Sounding);
    }
    assert_eq!(hw.updates, 5);
    // No naps while sounding: the sweep needs every loop.
    assert_eq!(hw.count(HwCall::Sleep(SleepDuration::Poll)), 0);

    hw.advance_ms(100);
    assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Idle);
    assert!(!horn.is_sounding());
    assert_eq!(hw.current_tune(), None);
    assert_eq!(notes(&hw), ["start", "tune_start", "tune_stop"]);
}

#[test]
fn boost_is_up_before_the_first_note() {
    let mut hw = MockHardware::new();
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);

    hw.press(Button::Horn, 0, 100);
    horn.step(&mut hw, &mut reg);

    let boost_on = hw.calls.iter().position(|c| *c == HwCall::Boost(true));
    let warble = hw.calls.iter().position(|c| *c == HwCall::Play(Tune::Warble));
    assert!(boost_on.is_some() && warble.is_some());
    assert!(boost_on < warble);
    assert!(hw.boost);

    // Released: the converter keeps idling.
    hw.advance_ms(100);
    horn.step(&mut hw, &mut reg);
    assert!(hw.boost);
    assert!(!hw.calls.contains(&HwCall::Boost(false)));
}

#[test]
fn long_mode_press_runs_selected_item_once() {
    let mut hw = MockHardware::new();
    let mut recorder = Recorder::new();
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    reg.register(&mut recorder).unwrap();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);

    long_press(&mut hw);
    step_until(&mut horn, &mut hw, &mut reg, HornAction::MenuRan);
    assert_eq!(notes(&hw), ["start", "menu 0"]);
    for _ in 0..20 {
        assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Idle);
    }
    assert_eq!(notes(&hw), ["start", "menu 0"]);

    long_press(&mut hw);
    step_until(&mut horn, &mut hw, &mut reg, HornAction::MenuRan);
    assert_eq!(notes(&hw), ["start", "menu 0", "menu 0"]);
}

#[test]
fn short_presses_cycle_through_items() {
    let mut hw = MockHardware::new();
    let mut first = Recorder::with_items(&["One", "Two"]);
    let mut second = Recorder::with_items(&["Three"]);
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    reg.register(&mut first).unwrap();
    reg.register(&mut second).unwrap();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);

    for expected in [1, 2, 0, 1] {
        short_press(&mut hw);
        step_until(&mut horn, &mut hw, &mut reg, HornAction::MenuSelected);
        assert_eq!(horn.selected(), expected);
    }
    assert_eq!(notes(&hw), ["start", "start"]);

    // Item 1 is the second entry of the first extension.
    long_press(&mut hw);
    step_until(&mut horn, &mut hw, &mut reg, HornAction::MenuRan);
    assert_eq!(notes(&hw), ["start", "start", "menu 1"]);
    assert_eq!(horn.selected(), 0);

    // Two steps on lands in the second extension.
    short_press(&mut hw);
    step_until(&mut horn, &mut hw, &mut reg, HornAction::MenuSelected);
    short_press(&mut hw);
    step_until(&mut horn, &mut hw, &mut reg, HornAction::MenuSelected);
    long_press(&mut hw);
    step_until(&mut horn, &mut hw, &mut reg, HornAction::MenuRan);
    assert_eq!(notes(&hw), ["start", "start", "menu 1", "menu 0"]);
}

#[test]
fn untouched_selection_falls_back_to_first_item() {
    let mut hw = MockHardware::new();
    let mut recorder = Recorder::with_items(&["One", "Two"]);
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    reg.register(&mut recorder).unwrap();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);

    short_press(&mut hw);
    step_until(&mut horn, &mut hw, &mut reg, HornAction::MenuSelected);
    assert_eq!(horn.selected(), 1);

    let touched = hw.now_ms();
    while hw.now_ms() - touched < MENU_TIMEOUT_MS {
        assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Idle);
    }
    horn.step(&mut hw, &mut reg);
    assert_eq!(horn.selected(), 0);
}

#[test]
fn horn_cuts_a_menu_press_short() {
    let mut hw = MockHardware::new();
    let mut recorder = Recorder::new();
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    reg.register(&mut recorder).unwrap();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);

    long_press(&mut hw);
    hw.press(Button::Horn, 200, 100);
    let end = hw.now_ms() + LONG_PRESS_MS * 2;
    let mut saw_sounding = false;
    while hw.now_ms() < end {
        match horn.step(&mut hw, &mut reg) {
            HornAction::Sounding => {
                saw_sounding = true;
                hw.advance_ms(10);
            }
            HornAction::Idle => {}
            other => panic!("unexpected {:?}", other),
        }
    }
    assert!(saw_sounding);
    assert_eq!(notes(&hw), ["start", "tune_start", "tune_stop"]);
}

#[test]
fn mode_without_extensions_does_nothing() {
    let mut hw = MockHardware::new();
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);

    long_press(&mut hw);
    let start = hw.now_ms();
    while hw.now_ms() - start < LONG_PRESS_MS + 500 {
        assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Idle);
    }
    assert_eq!(hw.current_tune(), None);
}

#[test]
fn idle_horn_naps_and_wakes_on_a_press() {
    let mut hw = MockHardware::new();
    let mut recorder = Recorder::new();
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    reg.register(&mut recorder).unwrap();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);
    let booted_ms = hw.now_ms();

    let mut steps = 0;
    while horn.step(&mut hw, &mut reg) != HornAction::Asleep {
        steps += 1;
        assert!(steps < 10_000, "never went to sleep");
    }
    assert!(horn.is_asleep());
    assert!(hw.now_ms() - booted_ms >= IDLE_SLEEP_MS);
    assert_eq!(notes(&hw), ["start", "sleep"]);
    // Converter down before the extensions hear about the nap.
    assert!(!hw.boost);

    // Nothing pressed: keeps napping in long sleeps.
    hw.clear_calls();
    for _ in 0..3 {
        assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Asleep);
    }
    assert_eq!(hw.calls, [HwCall::Sleep(SleepDuration::Long); 3]);

    // A short tap during the nap is caught by the latch.
    hw.press(Button::Horn, 100, 50);
    assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Woke);
    assert!(!horn.is_asleep());
    assert!(hw.boost);
    assert_eq!(notes(&hw), ["start", "sleep", "wake"]);

    // Awake again: the horn works straight away.
    hw.press(Button::Horn, 0, 100);
    assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Sounding);
}

#[test]
fn sounding_keeps_the_horn_awake() {
    let mut hw = MockHardware::new();
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);

    hw.press(Button::Horn, 0, IDLE_SLEEP_MS * 2);
    let mut held_ms = 0;
    while held_ms < IDLE_SLEEP_MS * 2 {
        assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Sounding);
        hw.advance_ms(100);
        held_ms += 100;
    }
    // Idle timer starts from the release.
    assert_eq!(horn.step(&mut hw, &mut reg), HornAction::Idle);
    assert!(!horn.is_asleep());
}

#[test]
fn watchdog_fed_every_step() {
    let mut hw = MockHardware::new();
    let mut reg: ExtensionRegistry<'_, MockHardware, 2> = ExtensionRegistry::new();
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut reg);
    for _ in 0..25 {
        horn.step(&mut hw, &mut reg);
    }
    assert_eq!(hw.feeds, 25);
}
