//! GPIO / peripheral pin assignments for the BikeHorn board.
//!
//! Single source of truth; every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Buttons (active-low, internal pull-up, RTC-capable for light-sleep wake)
// ---------------------------------------------------------------------------

/// Handlebar horn button.  Sounds the horn; a `1` during code entry.
pub const HORN_BUTTON_GPIO: i32 = 4;
/// Mode button.  Opens the extension menu; a `0` during code entry.
pub const MODE_BUTTON_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Accelerometer (ADXL335-style, analog outputs, switched supply)
// ---------------------------------------------------------------------------

/// Digital output: HIGH powers the accelerometer.
pub const ACCEL_POWER_GPIO: i32 = 6;
/// X/Y/Z outputs on ADC1 channels 0–2 (GPIO 1–3 on ESP32-S3).
pub const ACCEL_X_ADC_CHANNEL: u32 = 0;
pub const ACCEL_Y_ADC_CHANNEL: u32 = 1;
pub const ACCEL_Z_ADC_CHANNEL: u32 = 2;

// ---------------------------------------------------------------------------
// Piezo (MCPWM tone timer)
// ---------------------------------------------------------------------------

/// MCPWM generator output driving the piezo through the H-bridge.
pub const PIEZO_GPIO: i32 = 10;
/// MCPWM group hosting the tone timer.
pub const TONE_MCPWM_GROUP: i32 = 0;

// ---------------------------------------------------------------------------
// Boost converter (LEDC PWM)
// ---------------------------------------------------------------------------

/// LEDC output switching the boost converter MOSFET.
pub const BOOST_PWM_GPIO: i32 = 11;
/// Boost switching frequency (62.5 kHz, 8-bit duty).
pub const BOOST_PWM_FREQ_HZ: u32 = 62_500;
/// LEDC channel reserved for the boost converter.
pub const BOOST_LEDC_CHANNEL: u32 = 0;
