//! Rating engine
//!
//! Per-drill and tier-wide rank estimates derived from the run ledger,
//! post-session evolution and lazy time decay.

pub mod engine;
pub mod estimate;
pub mod evolution;
pub mod policy;

pub use engine::{
    Baseline, BaselineEntry, RatingEngine, RatingSource, RatingsSnapshot, SubcategoryValue,
};
pub use estimate::EstimatedRank;
pub use evolution::{achieved_value, evolved_value, nth_highest, MIN_SESSION_ATTEMPTS};
pub use policy::{Aggregation, AggregationPolicy, Decay, DecayPolicy};
