//! Sound generation: calibrated two-timer tone output, the warble sweep,
//! and the built-in tune player.

pub mod calibration;
pub mod tone;
pub mod tunes;
pub mod warble;

/// Anything that can sound a square wave at a frequency.
///
/// Implemented by [`tone::ToneGenerator`]; lets the sweep and the tune
/// player be exercised without timer hardware.
pub trait ToneOutput {
    /// Start a tone on a silent output.
    fn play(&mut self, frequency_hz: u16);
    /// Retune an already sounding output without a glitch.
    fn change(&mut self, frequency_hz: u16);
    fn stop(&mut self);
}
