use thiserror::Error;

mod app_config;
mod config;
mod types;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use types::{
    DateRange, DateRangeError, Platform, PlatformFailure, PublishPolicy, RunSummary, SinkReport,
    TripleKey, VideoStatRecord,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
