//! Run ledger
//!
//! Append-only history of drill runs. Records are validated and
//! deduplicated on ingest and never mutated afterwards.

pub mod record;
pub mod store;

pub use record::{RawRun, RejectReason, RunRecord, SessionId};
pub use store::{IngestReport, LedgerSnapshot, RunLedger};
