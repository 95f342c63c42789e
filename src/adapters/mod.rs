//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                     |
//! |------------|---------------------|---------------------------------|
//! | `hardware` | TuneStream          | MCPWM tone + LEDC boost timers  |
//! |            | AccelerometerPort   | ADC1, power GPIO                |
//! |            | ButtonPort          | Button GPIOs + ISR latch        |
//! |            | SleepPort           | Light sleep                     |
//! |            | WatchdogPort        | Task watchdog                   |
//! |            | BoostPort           | LEDC boost channel              |
//! | `log_sink` | EventSink           | Serial log output               |
//! | `storage`  | StoragePort         | NVS blob (calibration image)    |
//! |            | ConfigPort          | NVS blob (postcard config)      |
//! | `time`     | ClockPort           | ESP32 system timer              |

pub mod hardware;
pub mod log_sink;
pub mod storage;
pub mod time;
