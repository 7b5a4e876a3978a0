//! Rank-unit scale
//!
//! Bidirectional piecewise-linear transform between raw drill scores and the
//! continuous rank-unit (RU) scale, anchored on validated threshold tables.

pub mod mapper;
pub mod thresholds;

pub use mapper::{
    horizontal_position, ladder_position, rank_unit, rank_unit_checked, score_for_rank_unit,
    LadderPosition,
};
pub use thresholds::{RankThreshold, ThresholdTable};

/// Display name for anything below the first threshold.
pub const UNRANKED: &str = "Unranked";
