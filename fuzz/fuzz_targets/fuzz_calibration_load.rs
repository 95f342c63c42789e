//! Fuzz target: `CalibrationTable::load`
//!
//! Feeds arbitrary EEPROM regions to the table parser and checks that an
//! accepted table can be evaluated over its whole input range and
//! re-encodes to the same records.
//!
//! cargo fuzz run fuzz_calibration_load

#![no_main]

use bikehorn::sound::calibration::{CalibrationTable, REGION_BYTES};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(table) = CalibrationTable::load(data) else {
        return;
    };
    let n = table.segments().len();
    assert!((1..=10).contains(&n));

    // Every period lands in some segment and evaluates without panicking.
    for x in (0..=u16::MAX).step_by(97).chain([u16::MAX]) {
        assert!(table.select(x) < n);
        let _ = table.apply(x);
    }

    let mut out = [0u8; REGION_BYTES];
    let written = table.encode(&mut out);
    assert_eq!(&out[..written], &data[..written]);
});
