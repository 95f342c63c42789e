//! System configuration parameters
//!
//! All tunable parameters for the horn and its burglar alarm.
//! Values can be overridden by a config blob in persistent storage.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::code_entry::{MAX_CODE_LENGTH, code_length, encode_code};

/// Core system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HornConfig {
    pub tone: ToneConfig,
    pub warble: WarbleConfig,
    pub alarm: AlarmConfig,
}

/// Tone timer clocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneConfig {
    /// Timer input clock (Hz) before the prescaler.
    pub clock_hz: u32,
    /// Tone timer prescaler.
    pub prescaler: u32,
    /// Boost compare (/255) held while silent so the rail stays charged.
    pub idle_boost_duty: u8,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            clock_hz: 16_000_000,
            prescaler: 8,
            idle_boost_duty: 5, // ~2 % duty
        }
    }
}

/// Horn / siren chirp sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarbleConfig {
    pub lower_hz: u16,
    pub upper_hz: u16,
    /// Frequency change per sweep step.
    pub step_hz: u16,
    /// Time for a full lower -> upper sweep (µs).
    pub rise_time_us: u32,
    /// Time for a full upper -> lower sweep (µs).
    pub fall_time_us: u32,
}

impl Default for WarbleConfig {
    fn default() -> Self {
        Self {
            lower_hz: 1000,
            upper_hz: 2500,
            step_hz: 10,
            rise_time_us: 150_000,
            fall_time_us: 150_000,
        }
    }
}

/// Burglar alarm behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Disarm PIN, `(sequence << 4) | length`.  Horn = 1, mode = 0.
    pub pin_code: u16,
    /// Quiet period after a button edge before the next press counts.
    pub debounce_ms: u32,
    /// Null-hypothesis rejection threshold in standard deviations.
    pub std_deviations: u8,
    /// Ticks spent ignoring motion after the first wake.
    pub awake_cycles: u32,
    /// Ticks of motion watch before relaxing back to sleep.
    pub alert_cycles: u32,
    /// Deadline for entering the PIN during the countdown.
    pub countdown_ms: u32,
    /// Maximum siren duration before silently re-arming.
    pub siren_ms: u32,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            pin_code: encode_code(0b100_1011, 7),
            debounce_ms: 50,
            std_deviations: 3,
            awake_cycles: 8,   // 2 s at 250 ms per tick
            alert_cycles: 120, // 30 s
            countdown_ms: 15_000,
            siren_ms: 120_000,
        }
    }
}

impl HornConfig {
    /// Range-check every field.  Persisting an invalid config is refused.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tone;
        if t.prescaler == 0 || t.clock_hz < t.prescaler {
            return Err(ConfigError::ValidationFailed(
                "tone clock must be at least the prescaler (non-zero)",
            ));
        }

        let w = &self.warble;
        if w.step_hz == 0 {
            return Err(ConfigError::ValidationFailed("warble step_hz must be > 0"));
        }
        if w.lower_hz == 0 || w.lower_hz >= w.upper_hz {
            return Err(ConfigError::ValidationFailed(
                "warble lower_hz must be > 0 and < upper_hz",
            ));
        }
        if (w.upper_hz - w.lower_hz) % w.step_hz != 0 {
            return Err(ConfigError::ValidationFailed(
                "warble range must be a whole number of steps",
            ));
        }
        if w.rise_time_us == 0 || w.fall_time_us == 0 {
            return Err(ConfigError::ValidationFailed("warble sweep times must be > 0"));
        }

        self.alarm.validate()
    }
}

impl AlarmConfig {
    /// Range-check the alarm settings on their own.  Also applied when the
    /// alarm is reconfigured at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = self;
        let len = code_length(a.pin_code);
        if len == 0 || len > MAX_CODE_LENGTH {
            return Err(ConfigError::ValidationFailed("pin_code length must be 1–12"));
        }
        if !(10..=1000).contains(&a.debounce_ms) {
            return Err(ConfigError::ValidationFailed("debounce_ms must be 10–1000"));
        }
        if !(1..=10).contains(&a.std_deviations) {
            return Err(ConfigError::ValidationFailed("std_deviations must be 1–10"));
        }
        if a.awake_cycles == 0 || a.alert_cycles == 0 {
            return Err(ConfigError::ValidationFailed("alarm cycle budgets must be > 0"));
        }
        if a.countdown_ms < 1000 || a.siren_ms < 1000 {
            return Err(ConfigError::ValidationFailed(
                "countdown_ms and siren_ms must be at least 1 s",
            ));
        }
        Ok(())
    }
}
