// Vibration Monitor — fixed-rate accelerometer sampling, Edge Impulse
// classification and windowed good/bad vibration verdicts.

pub mod config;
pub mod drivers;
pub mod ei;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod report;
pub mod sampler;
pub mod vote;

pub use error::{ClassifierError, ConfigError, PipelineError, SensorError};
pub use pipeline::Pipeline;
pub use vote::{Outcome, Verdict, VoteAggregator};

/// Route the `log` facade to the ESP-IDF logger.
#[cfg(target_os = "espidf")]
pub fn init_logging() {
    esp_idf_svc::log::EspLogger::initialize_default();
}

/// Route the `log` facade to stderr; `RUST_LOG` picks the level.
#[cfg(not(target_os = "espidf"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
