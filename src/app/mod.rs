//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the orchestration: the horn's super-loop, the service
//! that drives the burglar alarm FSM, the events it reports, and the
//! **port traits** in [`ports`] through which every piece of hardware is
//! reached.  Nothing here touches a peripheral directly, so all of it runs
//! on the host against mock adapters.

pub mod events;
pub mod horn;
pub mod ports;
pub mod service;
