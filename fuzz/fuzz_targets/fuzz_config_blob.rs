//! Fuzz target: persisted `HornConfig` blob
//!
//! A corrupted NVS blob must decode to an error or to a config that
//! `validate()` can judge, never to a panic.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use bikehorn::config::HornConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(cfg) = postcard::from_bytes::<HornConfig>(data) {
        if cfg.validate().is_ok() {
            assert!(cfg.warble.lower_hz < cfg.warble.upper_hz);
            assert!(cfg.tone.prescaler > 0);
        }
    }
});
