// Snapshot persistence
// MessagePack + LZ4 compression with versioning and integrity checks

pub mod error;
pub mod format;
pub mod store;

pub use error::SnapshotError;
pub use format::{decompress_and_deserialize, serialize_and_compress, Envelope};
pub use store::{KeyValueStore, MemoryStore};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub const SNAPSHOT_VERSION: u32 = 1;

pub const LEDGER_KEY: &str = "rank_core/ledger";
pub const SESSION_KEY: &str = "rank_core/session";
pub const RATINGS_KEY: &str = "rank_core/ratings";

/// Encode `payload` and write it under `key`.
pub fn write_snapshot<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    payload: &T,
    saved_at_ms: i64,
) -> Result<(), SnapshotError> {
    let bytes = serialize_and_compress(&Envelope::new(payload, saved_at_ms))?;
    store.put(key, bytes);
    Ok(())
}

/// Read and decode `key`; `Ok(None)` when nothing is stored.
pub fn read_snapshot<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, SnapshotError> {
    match store.get(key) {
        Some(bytes) => Ok(Some(decompress_and_deserialize::<T>(&bytes)?.payload)),
        None => Ok(None),
    }
}
