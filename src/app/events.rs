//! Outbound application events.
//!
//! The [`AlarmService`](super::service::AlarmService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; log to serial, beep, count, etc.

use crate::fsm::AlarmStateId;

/// Structured events emitted by the alarm core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    /// The alarm service has started (carries the initial state).
    Started(AlarmStateId),

    /// The FSM moved.  `to == None` means the machine exited.
    StateChanged {
        from: AlarmStateId,
        to: Option<AlarmStateId>,
    },

    /// Motion windows are full; detection is live.
    Calibrated,

    /// Movement was detected while in the given state.
    MotionDetected(AlarmStateId),

    /// A complete but wrong code was entered.
    CodeRejected { attempts: u16 },

    /// The correct code was entered.
    Disarmed,

    /// Arming was cancelled by a button press during calibration.
    Cancelled,

    /// The service has shut the sensor and sound down.
    Stopped,
}
