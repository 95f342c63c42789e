//! BikeHorn firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod code_entry;
pub mod config;
pub mod error;
pub mod extensions;
pub mod fsm;
pub mod motion;
pub mod sound;

pub mod pins;

// Board support. The real implementations are guarded by cfg attributes
// inside; host builds get simulation stubs.
pub mod adapters;
pub mod drivers;
