//! Startup errors for the service.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while configuring or starting the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to read config file {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    ParseConfig(#[from] serde_yaml::Error),
}

/// Result type for service setup.
pub type Result<T> = std::result::Result<T, ServiceError>;
