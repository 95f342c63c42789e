//! Board drivers, hardware initialisation, and peripheral helpers.

pub mod accelerometer;
pub mod button;
pub mod hw_init;
pub mod sleep;
pub mod tone_timer;
pub mod watchdog;
