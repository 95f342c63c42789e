//! Square-wave tone generation with glitch-free frequency changes.
//!
//! Two timers cooperate: the tone timer drives the piezo (period = `top`,
//! duty = `compare`) and the boost timer sets the converter duty.  Changing
//! the tone timer's period while it counts can truncate a cycle and click,
//! so in-flight changes are double-buffered through [`ToneState`]:
//!
//! ```text
//!  main loop                         tone timer overflow ISR
//!  ─────────                         ───────────────────────
//!  mask overflow irq
//!  pending = (top, compare)
//!  update_requested = true
//!  unmask overflow irq ───────────▶  counter wraps to 0
//!                                    take pending, write TOP + CMP
//!                                    current = pending
//!                                    mask overflow irq
//! ```
//!
//! The ISR is the only writer of `current` while the timer runs.  `play`
//! reseeds it only with the interrupt masked, before the tone is audible.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::debug;

use super::ToneOutput;
use super::calibration::CalibrationTable;
use crate::app::ports::{ToneRegisters, ToneTimerPort};
use crate::config::ToneConfig;

const fn pack(top: u16, compare: u16) -> u32 {
    ((top as u32) << 16) | compare as u32
}

const fn unpack(v: u32) -> (u16, u16) {
    ((v >> 16) as u16, v as u16)
}

// ---------------------------------------------------------------------------
// Shared state (main context <-> overflow ISR)
// ---------------------------------------------------------------------------

/// Double-buffered tone timer settings.
///
/// `top` and `compare` travel as one packed word so neither side can ever
/// observe half an update.
pub struct ToneState {
    current: AtomicU32,
    pending: AtomicU32,
    update_requested: AtomicBool,
}

impl Default for ToneState {
    fn default() -> Self {
        Self::new()
    }
}

impl ToneState {
    pub const fn new() -> Self {
        Self {
            current: AtomicU32::new(0),
            pending: AtomicU32::new(0),
            update_requested: AtomicBool::new(false),
        }
    }

    /// `(top, compare)` currently loaded in the timer.
    pub fn current(&self) -> (u16, u16) {
        unpack(self.current.load(Ordering::Acquire))
    }

    /// `(top, compare)` waiting for the next wrap, if any.
    pub fn pending(&self) -> Option<(u16, u16)> {
        self.update_requested
            .load(Ordering::Acquire)
            .then(|| unpack(self.pending.load(Ordering::Acquire)))
    }

    /// Main context only, with the overflow interrupt masked.
    fn request(&self, top: u16, compare: u16) {
        self.pending.store(pack(top, compare), Ordering::Relaxed);
        self.update_requested.store(true, Ordering::Release);
    }

    /// Main context only, with the overflow interrupt masked and the timer
    /// about to be reprogrammed directly.
    fn reseed(&self, top: u16, compare: u16) {
        self.update_requested.store(false, Ordering::Relaxed);
        self.current.store(pack(top, compare), Ordering::Release);
    }

    fn cancel(&self) {
        self.update_requested.store(false, Ordering::Release);
    }

    /// ISR only.  Consumes the pending update exactly once.
    fn take_pending(&self) -> Option<(u16, u16)> {
        if self.update_requested.swap(false, Ordering::AcqRel) {
            let v = self.pending.load(Ordering::Acquire);
            self.current.store(v, Ordering::Release);
            Some(unpack(v))
        } else {
            None
        }
    }
}

/// Body of the tone timer overflow interrupt.
///
/// Applies a pending period/compare pair at the wrap and masks itself
/// again so the update is never re-applied.  Returns `true` if registers
/// were written.
pub fn service_overflow(state: &ToneState, regs: &mut impl ToneRegisters) -> bool {
    let applied = match state.take_pending() {
        Some((top, compare)) => {
            regs.write_tone_registers(top, compare);
            true
        }
        None => false,
    };
    regs.set_overflow_interrupt(false);
    applied
}

// ---------------------------------------------------------------------------
// Timer arithmetic
// ---------------------------------------------------------------------------

/// Register values for one frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub top: u16,
    pub compare: u16,
    pub boost: u8,
}

// ---------------------------------------------------------------------------
// ToneGenerator
// ---------------------------------------------------------------------------

/// Owns both timers and their calibration tables.
pub struct ToneGenerator<'a, T: ToneTimerPort> {
    timer: T,
    state: &'a ToneState,
    tone_cal: CalibrationTable,
    boost_cal: CalibrationTable,
    config: ToneConfig,
    sounding: bool,
}

impl<'a, T: ToneTimerPort> ToneGenerator<'a, T> {
    pub fn new(
        timer: T,
        state: &'a ToneState,
        tone_cal: CalibrationTable,
        boost_cal: CalibrationTable,
        config: ToneConfig,
    ) -> Self {
        Self {
            timer,
            state,
            tone_cal,
            boost_cal,
            config,
            sounding: false,
        }
    }

    /// Timer period and calibrated duties for `frequency_hz`.
    /// 0 Hz is treated as 1 Hz; the period saturates at the 16-bit limit.
    pub fn settings_for(&self, frequency_hz: u16) -> TimerSettings {
        let ticks_per_sec = self.config.clock_hz / self.config.prescaler.max(1);
        let top = (ticks_per_sec / u32::from(frequency_hz.max(1))).min(u32::from(u16::MAX)) as u16;
        let compare = self.tone_cal.apply(top).clamp(0, i32::from(top)) as u16;
        let boost = self.boost_cal.apply(top).clamp(0, i32::from(u8::MAX)) as u8;
        TimerSettings {
            top,
            compare,
            boost,
        }
    }

    /// Program both timers directly.  Only for a silent/stopped tone timer.
    pub fn play(&mut self, frequency_hz: u16) {
        let s = self.settings_for(frequency_hz);
        self.timer.set_overflow_interrupt(false);
        self.state.reseed(s.top, s.compare);
        self.timer.set_boost_compare(s.boost);
        self.timer.configure_tone(s.top, s.compare);
        self.sounding = true;
        debug!("tone: play {} Hz (top={}, cmp={}, boost={})", frequency_hz, s.top, s.compare, s.boost);
    }

    /// Retune a sounding timer at its next natural wrap.
    pub fn change(&mut self, frequency_hz: u16) {
        if !self.sounding {
            self.play(frequency_hz);
            return;
        }
        let s = self.settings_for(frequency_hz);
        self.timer.set_overflow_interrupt(false);
        self.state.request(s.top, s.compare);
        self.timer.set_boost_compare(s.boost);
        self.timer.set_overflow_interrupt(true);
    }

    /// Silence the piezo and park the boost converter at idle duty.
    pub fn stop(&mut self) {
        self.timer.set_overflow_interrupt(false);
        self.state.cancel();
        self.timer.disable_tone();
        self.timer.set_boost_compare(self.config.idle_boost_duty);
        self.sounding = false;
    }

    /// Enable the boost converter at idle duty.
    pub fn start_boost(&mut self) {
        self.timer.set_boost_compare(self.config.idle_boost_duty);
        self.timer.enable_boost();
    }

    pub fn stop_boost(&mut self) {
        self.timer.disable_boost();
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding
    }

    pub fn state(&self) -> &ToneState {
        self.state
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

impl<T: ToneTimerPort> ToneOutput for ToneGenerator<'_, T> {
    fn play(&mut self, frequency_hz: u16) {
        ToneGenerator::play(self, frequency_hz);
    }

    fn change(&mut self, frequency_hz: u16) {
        ToneGenerator::change(self, frequency_hz);
    }

    fn stop(&mut self) {
        ToneGenerator::stop(self);
    }
}
