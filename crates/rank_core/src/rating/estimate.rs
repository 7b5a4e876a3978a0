use serde::{Deserialize, Serialize};

use crate::scale::{ladder_position, UNRANKED};

/// Derived rank description; always recomputed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedRank {
    pub rank_name: String,
    /// Rank units
    pub continuous_value: f64,
    /// Percent toward the next rank (0-100)
    pub progress_to_next: f64,
}

impl EstimatedRank {
    pub fn unranked() -> Self {
        Self { rank_name: UNRANKED.to_string(), continuous_value: 0.0, progress_to_next: 0.0 }
    }

    /// Place `value` on a ladder of rank names, lowest first.
    pub fn on_ladder<'a>(value: f64, ladder: impl IntoIterator<Item = &'a str>) -> Self {
        let names: Vec<&str> = ladder.into_iter().collect();
        let position = ladder_position(value, names.len());
        let rank_name = position
            .index
            .and_then(|i| names.get(i).copied())
            .unwrap_or(UNRANKED)
            .to_string();

        Self { rank_name, continuous_value: value, progress_to_next: position.progress }
    }

    pub fn is_ranked(&self) -> bool {
        self.rank_name != UNRANKED
    }
}

impl Default for EstimatedRank {
    fn default() -> Self {
        Self::unranked()
    }
}
