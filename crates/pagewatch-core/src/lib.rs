pub mod app_config;
pub mod config;
pub mod normalize;
pub mod observations;
pub mod resources;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use normalize::{normalize_url, UrlError};
pub use observations::{ChangeSummary, Observation, Outcome, OutcomeKind};
pub use resources::{
    validate_group_label, validate_title, MonitoredResource, DEFAULT_GROUP_LABEL,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown observation outcome: {0}")]
    UnknownOutcome(String),

    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("{field} must not be blank")]
    BlankField { field: &'static str },
}
