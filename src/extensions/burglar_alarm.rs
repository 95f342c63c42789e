//! Burglar alarm menu entry.
//!
//! Arms the accelerometer watch and blocks inside [`AlarmService::run`]
//! until the owner disarms it (or cancels during calibration).

use log::{info, warn};

use super::Extension;
use crate::app::ports::{AlarmPorts, ConfigError, EventSink};
use crate::app::service::AlarmService;
use crate::config::AlarmConfig;

pub struct BurglarAlarmExtension<S: EventSink> {
    config: AlarmConfig,
    sink: S,
    runs: u32,
}

impl<S: EventSink> BurglarAlarmExtension<S> {
    /// An invalid `config` is replaced by the defaults.
    pub fn new(config: AlarmConfig, sink: S) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("burglar alarm: {}, using defaults", e);
                AlarmConfig::default()
            }
        };
        Self {
            config,
            sink,
            runs: 0,
        }
    }

    /// Number of completed alarm sessions.
    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    /// Applies to the next session.  An invalid config is refused and the
    /// current one kept.
    pub fn set_config(&mut self, config: AlarmConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }
}

impl<H: AlarmPorts, S: EventSink> Extension<H> for BurglarAlarmExtension<S> {
    fn name(&self) -> &'static str {
        "burglar-alarm"
    }

    fn menu_items(&self) -> &'static [&'static str] {
        &["Burglar alarm"]
    }

    fn run_menu_item(&mut self, _index: usize, hw: &mut H) {
        info!("Starting burglar alarm");
        let mut service = AlarmService::new(self.config);
        // Launched from the awake horn, which keeps the converter running.
        service.set_resting_boost(true);
        service.run(hw, &mut self.sink);
        self.runs += 1;
        info!("Exiting burglar alarm");
    }
}
