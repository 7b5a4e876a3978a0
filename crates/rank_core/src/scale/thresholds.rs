//! Validated threshold tables
//!
//! A table is the only way thresholds reach the mapper, so every
//! `rank_unit` call works on ascending, positive, finite values.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{RankError, Result};

/// One named rank and the score that reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankThreshold {
    pub name: String,
    pub score: f64,
}

/// Ordered rank thresholds for a single drill within a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RankThreshold>", into = "Vec<RankThreshold>")]
pub struct ThresholdTable {
    ranks: Vec<RankThreshold>,
}

impl ThresholdTable {
    /// Build a table from `(name, score)` pairs in ladder order.
    pub fn new<N: Into<String>>(pairs: impl IntoIterator<Item = (N, f64)>) -> Result<Self> {
        let ranks = pairs
            .into_iter()
            .map(|(name, score)| RankThreshold { name: name.into(), score })
            .collect();
        Self::from_ranks(ranks)
    }

    pub fn from_ranks(ranks: Vec<RankThreshold>) -> Result<Self> {
        validate_ranks(&ranks)?;
        Ok(Self { ranks })
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn ranks(&self) -> &[RankThreshold] {
        &self.ranks
    }

    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.ranks.iter().map(|r| r.score)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.ranks.iter().map(|r| r.name.as_str())
    }

    /// Score at 0-based threshold index.
    pub fn score_at(&self, index: usize) -> Option<f64> {
        self.ranks.get(index).map(|r| r.score)
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.ranks.get(index).map(|r| r.name.as_str())
    }

    /// Lower and upper bound of segment `i`, with a virtual 0 below the first threshold.
    pub(crate) fn segment(&self, i: usize) -> (f64, f64) {
        let upper = self.ranks[i].score;
        let lower = if i == 0 { 0.0 } else { self.ranks[i - 1].score };
        (lower, upper)
    }

    /// Rank name reached at `ru`, or `None` below the first threshold.
    pub fn rank_at(&self, ru: f64) -> Option<&str> {
        super::ladder_position(ru, self.len()).index.and_then(|i| self.name_at(i))
    }
}

impl TryFrom<Vec<RankThreshold>> for ThresholdTable {
    type Error = RankError;

    fn try_from(ranks: Vec<RankThreshold>) -> Result<Self> {
        Self::from_ranks(ranks)
    }
}

impl From<ThresholdTable> for Vec<RankThreshold> {
    fn from(table: ThresholdTable) -> Self {
        table.ranks
    }
}

fn validate_ranks(ranks: &[RankThreshold]) -> Result<()> {
    if ranks.is_empty() {
        return Err(RankError::thresholds("threshold list is empty"));
    }

    let mut seen_names = HashSet::new();
    let mut previous: Option<&RankThreshold> = None;

    for rank in ranks {
        if rank.name.trim().is_empty() {
            return Err(RankError::thresholds("rank name is blank"));
        }
        if !seen_names.insert(rank.name.as_str()) {
            return Err(RankError::thresholds(format!("duplicate rank name '{}'", rank.name)));
        }
        if !rank.score.is_finite() {
            return Err(RankError::thresholds(format!(
                "rank '{}' has non-finite score {}",
                rank.name, rank.score
            )));
        }

        match previous {
            None if rank.score <= 0.0 => {
                return Err(RankError::thresholds(format!(
                    "lowest threshold '{}' must be above 0, got {}",
                    rank.name, rank.score
                )));
            }
            Some(prev) if rank.score == prev.score => {
                return Err(RankError::thresholds(format!(
                    "ranks '{}' and '{}' share score {}",
                    prev.name, rank.name, rank.score
                )));
            }
            Some(prev) if rank.score < prev.score => {
                return Err(RankError::thresholds(format!(
                    "rank '{}' ({}) is below preceding rank '{}' ({})",
                    rank.name, rank.score, prev.name, prev.score
                )));
            }
            _ => {}
        }
        previous = Some(rank);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_table() {
        let table =
            ThresholdTable::new([("Silver", 1000.0), ("Gold", 1500.0), ("Platinum", 2000.0)])
                .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.name_at(1), Some("Gold"));
        assert_eq!(table.segment(0), (0.0, 1000.0));
        assert_eq!(table.segment(2), (1500.0, 2000.0));
    }

    #[test]
    fn test_rejects_degenerate_input() {
        let empty: Vec<(&str, f64)> = Vec::new();
        assert!(matches!(ThresholdTable::new(empty), Err(RankError::InvalidThresholds { .. })));

        let unsorted = ThresholdTable::new([("A", 200.0), ("B", 100.0)]);
        assert!(matches!(unsorted, Err(RankError::InvalidThresholds { .. })));

        let duplicate = ThresholdTable::new([("A", 100.0), ("B", 100.0)]);
        assert!(duplicate.unwrap_err().to_string().contains("share score"));

        assert!(ThresholdTable::new([("A", 0.0), ("B", 100.0)]).is_err());
        assert!(ThresholdTable::new([("A", f64::NAN)]).is_err());
        assert!(ThresholdTable::new([("A", 10.0), ("A", 20.0)]).is_err());
        assert!(ThresholdTable::new([(" ", 10.0)]).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: ThresholdTable =
            serde_json::from_str(r#"[{"name":"Iron","score":10},{"name":"Bronze","score":20}]"#)
                .unwrap();
        assert_eq!(ok.len(), 2);

        let bad: std::result::Result<ThresholdTable, _> =
            serde_json::from_str(r#"[{"name":"Iron","score":20},{"name":"Bronze","score":10}]"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_rank_at() {
        let table = ThresholdTable::new([("Silver", 1000.0), ("Gold", 1500.0)]).unwrap();
        assert_eq!(table.rank_at(0.99), None);
        assert_eq!(table.rank_at(1.0), Some("Silver"));
        assert_eq!(table.rank_at(2.4), Some("Gold"));
        assert_eq!(table.rank_at(7.0), Some("Gold"));
    }
}
