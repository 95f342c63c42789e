//! The horn's own super-loop, one step at a time.
//!
//! ```text
//!            horn down                       horn up
//!  IDLE ───────────────────▶ SOUNDING ─────────────────▶ IDLE
//!   │  mode short press ─▶ next menu item
//!   │  mode long press  ─▶ run selected item (blocks) ─▶ IDLE
//!   │  quiet for IDLE_SLEEP_MS
//!   ▼
//!  ASLEEP ──[any button]──▶ IDLE
//! ```
//!
//! Mode presses are judged on release: shorter than [`LONG_PRESS_MS`]
//! moves the selection on (wrapping), longer runs the selected item.  The
//! selection drops back to the first item after [`MENU_TIMEOUT_MS`]
//! without a mode press, and after every run.
//!
//! Extensions hear about every edge: `on_tune_start` before the warble
//! starts, `on_tune_stop` after it stops, `on_sleep` / `on_wake` around the
//! idle naps.
//!
//! The boost converter runs whenever the horn is awake, held at idle duty
//! between notes so the piezo supply is already up when the button goes
//! down.  It is switched off for the naps.

use log::{debug, info};

use super::ports::{AlarmPorts, Button, SleepDuration, Tune};
use crate::extensions::ExtensionRegistry;

/// Quiet time before the horn starts napping between button checks.
pub const IDLE_SLEEP_MS: u32 = 10_000;

/// A mode press held at least this long is a long press.
pub const LONG_PRESS_MS: u32 = 1_000;

/// Untouched menu selection falls back to the first item after this.
pub const MENU_TIMEOUT_MS: u32 = 5_000;

/// What one [`HornLoop::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HornAction {
    Idle,
    Sounding,
    /// A short mode press moved the menu selection.
    MenuSelected,
    /// A menu action ran to completion.
    MenuRan,
    Asleep,
    Woke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Sounding,
    Asleep,
}

/// Mode button as seen by the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModeButton {
    Up,
    /// Held since this time.
    Down(u32),
    /// Held, but already used for something else; ignored until released.
    Spent,
}

pub struct HornLoop {
    phase: Phase,
    idle_since_ms: u32,
    mode: ModeButton,
    selected: usize,
    menu_touched_ms: u32,
}

impl HornLoop {
    pub fn new(now_ms: u32) -> Self {
        Self {
            phase: Phase::Idle,
            idle_since_ms: now_ms,
            mode: ModeButton::Up,
            selected: 0,
            menu_touched_ms: now_ms,
        }
    }

    /// Boot hook.  Call once before the first [`step`](Self::step).
    pub fn start<H: AlarmPorts, const N: usize>(
        &mut self,
        hw: &mut H,
        extensions: &mut ExtensionRegistry<'_, H, N>,
    ) {
        hw.set_boost(true);
        extensions.call_on_start(hw);
        // Wake presses taken before boot are stale.
        let _ = hw.take_press();
        self.idle_since_ms = hw.now_ms();
    }

    pub fn is_sounding(&self) -> bool {
        self.phase == Phase::Sounding
    }

    pub fn is_asleep(&self) -> bool {
        self.phase == Phase::Asleep
    }

    /// Global index of the menu item a long press would run.
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn step<H: AlarmPorts, const N: usize>(
        &mut self,
        hw: &mut H,
        extensions: &mut ExtensionRegistry<'_, H, N>,
    ) -> HornAction {
        hw.feed();

        if self.phase == Phase::Asleep {
            return self.nap(hw, extensions);
        }

        let horn = hw.is_pressed(Button::Horn);
        let now_us = hw.now_us();

        match (self.phase, horn) {
            (Phase::Idle, true) => {
                // The horn cuts short any menu press in progress.
                if self.mode != ModeButton::Up {
                    self.mode = ModeButton::Spent;
                }
                extensions.call_on_tune_start(hw);
                hw.play(Tune::Warble, now_us);
                self.phase = Phase::Sounding;
                return HornAction::Sounding;
            }
            (Phase::Sounding, true) => {
                // Tight loop: the sweep steps every millisecond or so.
                hw.update(now_us);
                return HornAction::Sounding;
            }
            (Phase::Sounding, false) => {
                hw.stop();
                extensions.call_on_tune_stop(hw);
                self.phase = Phase::Idle;
                self.idle_since_ms = hw.now_ms();
            }
            (Phase::Idle, false) | (Phase::Asleep, _) => {}
        }

        let now_ms = hw.now_ms();
        let mode = hw.is_pressed(Button::Mode);
        match (self.mode, mode) {
            (ModeButton::Up, true) => self.mode = ModeButton::Down(now_ms),
            (ModeButton::Down(since), false) => {
                self.mode = ModeButton::Up;
                if let Some(action) = self.mode_released(now_ms.wrapping_sub(since), hw, extensions)
                {
                    return action;
                }
            }
            (ModeButton::Spent, false) => self.mode = ModeButton::Up,
            _ => {}
        }
        if mode {
            self.idle_since_ms = now_ms;
        }

        if self.selected != 0 && now_ms.wrapping_sub(self.menu_touched_ms) >= MENU_TIMEOUT_MS {
            debug!("menu: selection timed out");
            self.selected = 0;
        }

        // Drain the latch so a press seen by polling is not replayed as a
        // wake after the next nap.
        let _ = hw.take_press();

        if now_ms.wrapping_sub(self.idle_since_ms) >= IDLE_SLEEP_MS {
            info!("horn: idle, napping");
            hw.set_boost(false);
            extensions.call_on_sleep(hw);
            self.selected = 0;
            self.phase = Phase::Asleep;
            return HornAction::Asleep;
        }

        hw.sleep(SleepDuration::Poll);
        HornAction::Idle
    }

    /// Act on a finished mode press.  `None` when there is no menu.
    fn mode_released<H: AlarmPorts, const N: usize>(
        &mut self,
        held_ms: u32,
        hw: &mut H,
        extensions: &mut ExtensionRegistry<'_, H, N>,
    ) -> Option<HornAction> {
        let items = extensions.menu_len();
        if items == 0 {
            return None;
        }

        if held_ms >= LONG_PRESS_MS {
            let index = self.selected % items;
            self.selected = 0;
            extensions.run_menu_item(index, hw);
            // Whatever the action left latched is not a wake press.
            let _ = hw.take_press();
            if hw.is_pressed(Button::Mode) {
                self.mode = ModeButton::Spent;
            }
            self.idle_since_ms = hw.now_ms();
            return Some(HornAction::MenuRan);
        }

        let now_ms = hw.now_ms();
        self.selected = (self.selected + 1) % items;
        self.menu_touched_ms = now_ms;
        self.idle_since_ms = now_ms;
        if let Some(entry) = extensions.menu_entry(self.selected) {
            info!("menu: '{}' selected", entry.label);
        }
        Some(HornAction::MenuSelected)
    }

    fn nap<H: AlarmPorts, const N: usize>(
        &mut self,
        hw: &mut H,
        extensions: &mut ExtensionRegistry<'_, H, N>,
    ) -> HornAction {
        hw.sleep(SleepDuration::Long);
        let pressed =
            hw.take_press() || hw.is_pressed(Button::Horn) || hw.is_pressed(Button::Mode);
        if !pressed {
            debug!("horn: still idle");
            return HornAction::Asleep;
        }
        info!("horn: woke");
        hw.set_boost(true);
        extensions.call_on_wake(hw);
        self.phase = Phase::Idle;
        // A held horn sounds on the next step; a held mode button only wakes.
        self.mode = if hw.is_pressed(Button::Mode) {
            ModeButton::Spent
        } else {
            ModeButton::Up
        };
        self.idle_since_ms = hw.now_ms();
        HornAction::Woke
    }
}
