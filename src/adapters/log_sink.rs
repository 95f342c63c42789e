//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing alarm events to the ESP-IDF logger
//! (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AlarmEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AlarmEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self { emitted: 0 }
    }

    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AlarmEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AlarmEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AlarmEvent::StateChanged { from, to } => match to {
                Some(to) => info!("STATE | {:?} -> {:?}", from, to),
                None => info!("STATE | {:?} -> exit", from),
            },
            AlarmEvent::Calibrated => {
                info!("ALARM | accelerometer calibrated, armed");
            }
            AlarmEvent::MotionDetected(state) => {
                warn!("ALARM | motion detected in {:?}", state);
            }
            AlarmEvent::CodeRejected { attempts } => {
                warn!("ALARM | wrong code (attempt {})", attempts);
            }
            AlarmEvent::Disarmed => {
                info!("ALARM | disarmed");
            }
            AlarmEvent::Cancelled => {
                info!("ALARM | cancelled before arming");
            }
            AlarmEvent::Stopped => {
                info!("ALARM | stopped");
            }
        }
    }
}
