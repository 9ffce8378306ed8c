use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetentionError>;

/// Failures at the edges of the engine: config files, CSV exports and
/// report output. The scoring functions themselves never fail.
#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("malformed row in {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to serialize report")]
    Serialize(#[from] serde_json::Error),
}
