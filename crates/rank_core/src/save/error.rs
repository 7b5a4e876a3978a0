use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("Decompression error")]
    Decompression,

    #[error("Corrupted data")]
    Corrupted,

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    #[error("Version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

impl SnapshotError {
    /// Whether retrying with another reader could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SnapshotError::VersionMismatch { .. } => true,
            SnapshotError::Serialization(_) => true,
            SnapshotError::Corrupted
            | SnapshotError::ChecksumMismatch
            | SnapshotError::Decompression
            | SnapshotError::Deserialization(_) => false,
        }
    }
}
