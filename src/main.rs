//! BikeHorn firmware entry point
//!
//! Hexagonal architecture around a single super-loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink   EepromAdapter  Esp32Clock │
//! │  (Tune+Boost+Inputs)  (EventSink)    (Storage+Cfg)  (Clock)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  HornLoop ─▶ ExtensionRegistry ─▶ BurglarAlarm         │    │
//! │  │                                   (AlarmService · FSM) │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use bikehorn::adapters::hardware::HardwareAdapter;
use bikehorn::adapters::log_sink::LogEventSink;
use bikehorn::adapters::storage::EepromAdapter;
use bikehorn::adapters::time::Esp32Clock;
use bikehorn::app::horn::HornLoop;
use bikehorn::app::ports::{ClockPort, ConfigPort};
use bikehorn::config::HornConfig;
use bikehorn::drivers::accelerometer::Accelerometer;
use bikehorn::drivers::button::{GpioButtons, RawInputPin};
use bikehorn::drivers::hw_init;
use bikehorn::drivers::sleep::LightSleep;
use bikehorn::drivers::tone_timer::{HwToneTimer, TONE_STATE};
use bikehorn::drivers::watchdog::Watchdog;
use bikehorn::error::Error;
use bikehorn::extensions::ExtensionRegistry;
use bikehorn::extensions::burglar_alarm::BurglarAlarmExtension;
use bikehorn::extensions::sos::SosExtension;
use bikehorn::pins;
use bikehorn::sound::calibration::{BOOST_TABLE_OFFSET, CalibrationTable, TONE_TABLE_OFFSET};
use bikehorn::sound::tone::ToneGenerator;

const MAX_EXTENSIONS: usize = 4;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BikeHorn v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = hw_init::init_peripherals().map_err(Error::from) {
        log::error!("HAL init failed ({}), halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    if let Err(e) = hw_init::init_isr_service().map_err(Error::from) {
        log::error!("ISR service init failed ({}), buttons will not wake", e);
    }

    // ── 3. Calibration and config from EEPROM image ───────────
    let store = match EepromAdapter::new() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("EEPROM image unavailable ({}), running uncalibrated", Error::from(e));
            None
        }
    };
    let config = match store.as_ref().map(|s| s.load()) {
        Some(Ok(cfg)) => {
            info!("Config loaded");
            cfg
        }
        Some(Err(e)) => {
            warn!("Config load failed ({}), using defaults", Error::from(e));
            HornConfig::default()
        }
        None => HornConfig::default(),
    };
    let (tone_cal, boost_cal) = match store.as_ref() {
        Some(s) => (
            CalibrationTable::load_or_zero(s, TONE_TABLE_OFFSET, "tone"),
            CalibrationTable::load_or_zero(s, BOOST_TABLE_OFFSET, "boost"),
        ),
        None => (CalibrationTable::zero(), CalibrationTable::zero()),
    };

    // ── 4. Construct adapters ─────────────────────────────────
    let timer = HwToneTimer::new(config.tone.clock_hz / config.tone.prescaler)
        .map_err(Error::from)?;
    let tone = ToneGenerator::new(timer, &TONE_STATE, tone_cal, boost_cal, config.tone);
    let buttons = GpioButtons::new(
        RawInputPin(pins::HORN_BUTTON_GPIO),
        RawInputPin(pins::MODE_BUTTON_GPIO),
    );
    let mut hw = HardwareAdapter::new(
        tone,
        &config.warble,
        buttons,
        Accelerometer::default(),
        LightSleep::new(),
        Watchdog::new(),
        Esp32Clock::new(),
    );

    // ── 5. Extensions ─────────────────────────────────────────
    let mut burglar = BurglarAlarmExtension::new(config.alarm, LogEventSink::new());
    let mut sos = SosExtension::new();
    let mut extensions: ExtensionRegistry<'_, HardwareAdapter, MAX_EXTENSIONS> =
        ExtensionRegistry::new();
    extensions
        .register(&mut burglar)
        .map_err(Error::from)?;
    extensions.register(&mut sos).map_err(Error::from)?;
    for name in extensions.names() {
        info!("Extension: {}", name);
    }

    // ── 6. Super-loop ─────────────────────────────────────────
    let mut horn = HornLoop::new(hw.now_ms());
    horn.start(&mut hw, &mut extensions);
    info!("System ready. Entering horn loop.");

    loop {
        horn.step(&mut hw, &mut extensions);
    }
}
