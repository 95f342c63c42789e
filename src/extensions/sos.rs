//! Morse SOS on repeat at full volume.  For emergencies only.
//!
//! Runs until the mode button is long-pressed; short presses are ignored
//! so a fumbled press does not silence it.

use log::{info, warn};

use super::Extension;
use crate::app::horn::LONG_PRESS_MS;
use crate::app::ports::{AlarmPorts, Button, SleepDuration, Tune};

#[derive(Debug, Default)]
pub struct SosExtension {
    runs: u32,
}

impl SosExtension {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times SOS was played and stopped.
    pub fn runs(&self) -> u32 {
        self.runs
    }
}

impl<H: AlarmPorts> Extension<H> for SosExtension {
    fn name(&self) -> &'static str {
        "sos"
    }

    fn menu_items(&self) -> &'static [&'static str] {
        &["SOS"]
    }

    fn run_menu_item(&mut self, _index: usize, hw: &mut H) {
        warn!("Playing SOS");
        hw.set_boost(true);
        let now_us = hw.now_us();
        hw.play(Tune::Sos, now_us);

        let mut held_since: Option<u32> = None;
        loop {
            hw.feed();
            let now_ms = hw.now_ms();
            match (held_since, hw.is_pressed(Button::Mode)) {
                (None, true) => held_since = Some(now_ms),
                (Some(since), false) => {
                    held_since = None;
                    if now_ms.wrapping_sub(since) >= LONG_PRESS_MS {
                        break;
                    }
                }
                _ => {}
            }
            let now_us = hw.now_us();
            hw.update(now_us);
            hw.sleep(SleepDuration::Poll);
        }

        hw.stop();
        self.runs += 1;
        info!("Stopping SOS");
    }
}
