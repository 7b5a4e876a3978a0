use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rmp_serde::{from_slice, to_vec_named};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::SnapshotError;
use super::SNAPSHOT_VERSION;

const CHECKSUM_LEN: usize = 32;

/// Versioned wrapper around every stored payload.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Envelope<T> {
    pub version: u32,
    /// Unix milliseconds at write time
    pub saved_at_ms: i64,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(payload: T, saved_at_ms: i64) -> Self {
        Self { version: SNAPSHOT_VERSION, saved_at_ms, payload }
    }
}

/// MessagePack, then LZ4 with the size prepended, then a SHA-256 trailer.
pub fn serialize_and_compress<T: Serialize>(envelope: &Envelope<T>) -> Result<Vec<u8>, SnapshotError> {
    let msgpack = to_vec_named(envelope)?;
    let compressed = compress_prepend_size(&msgpack);

    let checksum = Sha256::digest(&compressed);
    let mut result = compressed;
    result.extend_from_slice(&checksum);

    log::debug!("Snapshot encoded: {} -> {} bytes", msgpack.len(), result.len());
    Ok(result)
}

pub fn decompress_and_deserialize<T: DeserializeOwned>(
    bytes: &[u8],
) -> Result<Envelope<T>, SnapshotError> {
    // size header + checksum
    if bytes.len() < 4 + CHECKSUM_LEN {
        return Err(SnapshotError::Corrupted);
    }

    let (payload, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if Sha256::digest(payload).as_slice() != checksum {
        return Err(SnapshotError::ChecksumMismatch);
    }

    let msgpack = decompress_size_prepended(payload).map_err(|_| SnapshotError::Decompression)?;
    let envelope: Envelope<T> = from_slice(&msgpack)?;

    if envelope.version > SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            found: envelope.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    Ok(envelope)
}
