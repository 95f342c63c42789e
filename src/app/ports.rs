//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AlarmService / ToneGenerator (domain)
//! ```
//!
//! Driven adapters (timers, buttons, accelerometer, sleep, storage, event
//! sinks) implement these traits.  The domain consumes them via generics,
//! so nothing under `sound/`, `motion/` or `fsm/` touches hardware.
//!
//! ## Safety notes
//!
//! - **ToneRegisters** is called from interrupt context; implementations
//!   must not block, allocate or log.
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **WatchdogPort** must be fed at least once per bounded loop iteration.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::HornConfig;

// ───────────────────────────────────────────────────────────────
// Tone timer ports (driven adapter: domain → timer peripherals)
// ───────────────────────────────────────────────────────────────

/// The subset of the tone timer touched by the overflow ISR.
pub trait ToneRegisters {
    /// Load period and compare together.  Called at counter wraparound.
    fn write_tone_registers(&mut self, top: u16, compare: u16);

    /// Mask / unmask the tone timer overflow interrupt.
    fn set_overflow_interrupt(&mut self, enabled: bool);
}

/// Tone timer plus boost converter timer, as used from the main loop.
pub trait ToneTimerPort: ToneRegisters {
    /// Put the tone timer in waveform mode with the given period and
    /// compare and start it from zero.
    fn configure_tone(&mut self, top: u16, compare: u16);

    /// Boost converter duty (/255).
    fn set_boost_compare(&mut self, compare: u8);

    /// Leave waveform mode and drive the piezo pin low.
    fn disable_tone(&mut self);

    fn enable_boost(&mut self);

    fn disable_boost(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Tune port (driven adapter: domain → background music)
// ───────────────────────────────────────────────────────────────

/// Built-in tunes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tune {
    /// Short rising double beep confirming an action.
    Acknowledge,
    /// One pip per second for the disarm window.
    Countdown,
    /// Low double beep for a rejected code.
    Error,
    /// Endless chirp sweep (horn and siren).
    Warble,
    /// Morse `...---...` on repeat until stopped.
    Sos,
}

/// Cooperative background tune player.
///
/// Nothing here blocks: `update` must be called every loop iteration and
/// advances at most to the current time.
pub trait TuneStream {
    /// Stop whatever is playing and start `tune`.
    fn play(&mut self, tune: Tune, now_us: u64);

    /// Play a short `tune` over the current one, which keeps time silently
    /// and regains the speaker afterwards.
    fn overlay(&mut self, tune: Tune, now_us: u64);

    /// `true` while the main tune has not finished.
    fn is_playing(&self) -> bool;

    fn update(&mut self, now_us: u64);

    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Alarm ports (driven adapters: hardware ↔ alarm FSM)
// ───────────────────────────────────────────────────────────────

/// Three-axis analog accelerometer with a switchable supply.
pub trait AccelerometerPort {
    fn power_on(&mut self);

    fn power_off(&mut self);

    /// One raw reading per axis.
    fn sample(&mut self) -> [i16; 3];
}

/// The two physical buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Encodes a `1` during code entry.
    Horn,
    /// Encodes a `0` during code entry.
    Mode,
}

/// Raw button level.  Debouncing is the caller's job.
pub trait ButtonPort {
    fn is_pressed(&mut self, button: Button) -> bool;

    /// Consume the "a button went down" latch.
    ///
    /// The latch is set from the GPIO interrupt so a short press during a
    /// long sleep is not lost.
    fn take_press(&mut self) -> bool;
}

/// Duration classes for [`SleepPort::sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepDuration {
    /// Short nap between polls while something is running.
    Poll,
    /// Accelerometer settle time after power-up.
    Settle,
    /// Deep idle between motion checks.
    Long,
}

impl SleepDuration {
    pub const fn as_ms(self) -> u32 {
        match self {
            Self::Poll => 15,
            Self::Settle => 250,
            Self::Long => 1000,
        }
    }
}

/// Bounded low-power sleep.  A button press may end it early.
pub trait SleepPort {
    fn sleep(&mut self, duration: SleepDuration);
}

/// Hardware watchdog.  Not feeding it resets the device.
pub trait WatchdogPort {
    fn feed(&mut self);
}

/// Monotonic time since boot.
pub trait ClockPort {
    fn now_us(&self) -> u64;

    /// Wrapping millisecond counter.
    fn now_ms(&self) -> u32 {
        (self.now_us() / 1000) as u32
    }
}

/// Boost converter switch, for the siren.
pub trait BoostPort {
    fn set_boost(&mut self, enabled: bool);
}

/// Everything the alarm service needs from the board, in one bound.
pub trait AlarmPorts:
    AccelerometerPort + ButtonPort + SleepPort + WatchdogPort + ClockPort + TuneStream + BoostPort
{
}

impl<T> AlarmPorts for T where
    T: AccelerometerPort + ButtonPort + SleepPort + WatchdogPort + ClockPort + TuneStream + BoostPort
{
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AlarmEvent`](super::events::AlarmEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AlarmEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the horn configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.  A corrupt PIN or a zero-length countdown would
/// otherwise lock the owner out of their own alarm.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    fn load(&self) -> Result<HornConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &HornConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ EEPROM image)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed persistent store (calibration tables).
///
/// Writes MUST be atomic per call: the ESP-IDF NVS blob API guarantees
/// this natively; the in-memory simulation achieves it trivially.
pub trait StoragePort {
    /// Size of the addressable image in bytes.
    fn capacity(&self) -> usize;

    /// Fill `buf` from `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The backing blob has never been written.
    NotFound,
    /// `offset + len` runs past the end of the image.
    OutOfBounds,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "image not found"),
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
