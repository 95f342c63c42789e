//! Accelerometer motion detection.
//!
//! Each axis keeps a rolling window of *differences* between consecutive
//! readings, so a tilted but stationary bike reads as "no change".  A new
//! difference further than `k` standard deviations from the window mean
//! counts as movement.

pub mod stats;

use log::debug;

use stats::{RollingStats, is_unlikely};

/// Differences kept per axis.
pub const WINDOW: usize = 16;

/// Readings needed before detection is meaningful: one to prime each
/// axis, then one per window slot.
pub const CALIBRATION_SAMPLES: usize = WINDOW + 1;

/// Floor for the standard deviation so a perfectly still window does not
/// flag every 1-LSB wobble.
const MIN_STD: f64 = 1.0;

const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// One accelerometer axis.
#[derive(Debug, Clone, Default)]
pub struct SensorChannel {
    window: RollingStats<WINDOW>,
    previous: Option<i32>,
}

impl SensorChannel {
    pub const fn new() -> Self {
        Self {
            window: RollingStats::new(),
            previous: None,
        }
    }

    /// Feed a reading during calibration.  No detection.
    pub fn calibrate(&mut self, reading: i32) {
        if let Some(prev) = self.previous {
            let delta = reading - prev;
            if !self.window.add(delta) {
                self.window.update(delta);
            }
        }
        self.previous = Some(reading);
    }

    pub fn is_calibrated(&self) -> bool {
        self.window.is_full()
    }

    /// Test `reading` against the window, then fold it in.
    pub fn is_moved(&mut self, reading: i32, k: f64) -> bool {
        let Some(prev) = self.previous.replace(reading) else {
            return false;
        };
        let delta = reading - prev;
        let moved = match (self.window.mean(), self.window.std()) {
            (Some(mean), Some(std)) => is_unlikely(f64::from(delta), mean, std.max(MIN_STD), k),
            _ => false,
        };
        if self.window.is_full() {
            self.window.update(delta);
        } else {
            self.window.add(delta);
        }
        moved
    }

    pub fn window(&self) -> &RollingStats<WINDOW> {
        &self.window
    }
}

/// Three axes and a shared threshold.
#[derive(Debug, Clone)]
pub struct MotionDetector {
    axes: [SensorChannel; 3],
    std_deviations: u8,
}

impl MotionDetector {
    pub fn new(std_deviations: u8) -> Self {
        Self {
            axes: [SensorChannel::new(), SensorChannel::new(), SensorChannel::new()],
            std_deviations,
        }
    }

    /// Drop all history.
    pub fn reset(&mut self) {
        self.axes = [SensorChannel::new(), SensorChannel::new(), SensorChannel::new()];
    }

    pub fn calibrate(&mut self, sample: [i16; 3]) {
        for (axis, reading) in self.axes.iter_mut().zip(sample) {
            axis.calibrate(i32::from(reading));
        }
    }

    /// All three windows are full.
    pub fn is_calibrated(&self) -> bool {
        self.axes.iter().all(SensorChannel::is_calibrated)
    }

    /// `true` if any axis moved.  Every axis is updated regardless.
    pub fn is_moved(&mut self, sample: [i16; 3]) -> bool {
        let k = f64::from(self.std_deviations);
        let mut moved = false;
        for ((axis, reading), name) in self.axes.iter_mut().zip(sample).zip(AXIS_NAMES) {
            if axis.is_moved(i32::from(reading), k) {
                debug!("motion on {} axis (reading {})", name, reading);
                moved = true;
            }
        }
        moved
    }

    pub fn axes(&self) -> &[SensorChannel; 3] {
        &self.axes
    }
}
