//! # rank_core - Ranked Aim-Training Progression
//!
//! Turns raw drill scores into a continuous skill rating and runs timed,
//! self-paced ranked practice sessions on top of it.
//!
//! ## Parts
//! - `scale`: piecewise-linear score <-> rank-unit (RU) transform
//! - `ledger`: append-only, deduplicated run history
//! - `rating`: per-drill and tier estimates, post-session evolution, decay
//! - `session`: the ranked session state machine
//! - `tracker`: [`RankTracker`], which wires the parts to a clock and a store
//!
//! ```rust
//! use rank_core::scale::{rank_unit, ThresholdTable};
//!
//! let table = ThresholdTable::new([("Silver", 1000.0), ("Gold", 1500.0), ("Platinum", 2000.0)])?;
//! assert_eq!(rank_unit(1250.0, &table), 1.5);
//! # Ok::<(), rank_core::RankError>(())
//! ```

// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Complex types are sometimes necessary for generic APIs
#![allow(clippy::type_complexity)]
// Session states carry the whole session inline
#![allow(clippy::large_enum_variant)]

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod rating;
pub mod save;
pub mod scale;
pub mod session;
pub mod tracker;

pub use catalog::{DrillCatalog, DrillDef, Subcategory, TierDef};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LedgerConfig, RankConfig, RatingConfig, SessionConfig};
pub use error::{RankError, Result};
pub use ledger::{IngestReport, RawRun, RunLedger, RunRecord, SessionId};
pub use rating::{AggregationPolicy, DecayPolicy, EstimatedRank, RatingEngine};
pub use scale::{rank_unit, RankThreshold, ThresholdTable};
pub use session::{SessionEvent, SessionScheduler, SessionState, SessionStatus, SessionSummary};
pub use tracker::{RankTracker, SubscriptionId};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
