use thiserror::Error;

use crate::save::SnapshotError;

/// Errors surfaced at configuration boundaries.
///
/// Runtime paths (ingest, state transitions, snapshot restore) never return
/// these; they degrade to safe defaults instead.
#[derive(Error, Debug)]
pub enum RankError {
    #[error("Invalid thresholds: {reason}")]
    InvalidThresholds { reason: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl RankError {
    pub fn thresholds(reason: impl Into<String>) -> Self {
        RankError::InvalidThresholds { reason: reason.into() }
    }

    /// True when the error came from host-supplied configuration rather than data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RankError::InvalidThresholds { .. }
                | RankError::InvalidConfig(_)
                | RankError::InvalidCatalog(_)
        )
    }
}

impl From<validator::ValidationErrors> for RankError {
    fn from(err: validator::ValidationErrors) -> Self {
        RankError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RankError>;
