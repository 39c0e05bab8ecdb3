use crate::driver::DriverError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Pool construction failure. Fatal: the run never starts on a partial pool.
    #[error("Resource init failed: {0}")]
    ResourceInit(#[source] DriverError),

    #[error("Internal error: {0}")]
    Internal(String),
}
