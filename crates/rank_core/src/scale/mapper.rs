//! Piecewise-linear score ⇄ rank-unit transform

use super::thresholds::ThresholdTable;
use crate::error::Result;

/// Map a raw score onto the rank-unit scale.
///
/// Segment `i` spans `[T(i-1), T(i))` with a virtual `T(-1) = 0`; a score at
/// threshold `i` maps to exactly `i + 1`. Scores past the top threshold reuse
/// the last segment's slope, scores below zero reuse the first.
pub fn rank_unit(score: f64, thresholds: &ThresholdTable) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }

    let last = thresholds.len() - 1;
    let i = thresholds.scores().position(|t| score < t).unwrap_or(last);
    let (lower, upper) = thresholds.segment(i);

    i as f64 + (score - lower) / (upper - lower)
}

/// Validate raw `(name, score)` pairs and map in one call.
pub fn rank_unit_checked<N: Into<String>>(
    score: f64,
    thresholds: impl IntoIterator<Item = (N, f64)>,
) -> Result<f64> {
    let table = ThresholdTable::new(thresholds)?;
    Ok(rank_unit(score, &table))
}

/// Inverse of [`rank_unit`]: the score that lands on `ru`.
pub fn score_for_rank_unit(ru: f64, thresholds: &ThresholdTable) -> f64 {
    if !ru.is_finite() {
        return 0.0;
    }

    let last = thresholds.len() - 1;
    let i = if ru <= 0.0 { 0 } else { (ru.floor() as usize).min(last) };
    let (lower, upper) = thresholds.segment(i);

    lower + (ru - i as f64) * (upper - lower)
}

/// Linear projection of an RU value onto a pixel axis.
pub fn horizontal_position(ru: f64, min_ru: f64, max_ru: f64, width_px: f64) -> f64 {
    let span = max_ru - min_ru;
    if span <= 0.0 || !span.is_finite() {
        return 0.0;
    }
    (ru - min_ru) / span * width_px
}

/// Where an RU value sits on a ladder of `len` named ranks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderPosition {
    /// 0-based rank index, `None` below the first rank.
    pub index: Option<usize>,
    /// Percent progress toward the next rank, 100 once the top rank is reached.
    pub progress: f64,
}

pub fn ladder_position(ru: f64, len: usize) -> LadderPosition {
    if len == 0 || !ru.is_finite() || ru < 1.0 {
        let progress = if ru.is_finite() { ru.clamp(0.0, 1.0) * 100.0 } else { 0.0 };
        return LadderPosition { index: None, progress };
    }

    let whole = ru.floor();
    let step = whole as usize;
    if step >= len {
        return LadderPosition { index: Some(len - 1), progress: 100.0 };
    }

    LadderPosition { index: Some(step - 1), progress: (ru - whole) * 100.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn five_step() -> ThresholdTable {
        ThresholdTable::new([
            ("Iron", 1000.0),
            ("Bronze", 1500.0),
            ("Silver", 2000.0),
            ("Gold", 2500.0),
            ("Platinum", 3000.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_midpoint_of_first_ranked_segment() {
        let table =
            ThresholdTable::new([("Silver", 1000.0), ("Gold", 1500.0), ("Platinum", 2000.0)])
                .unwrap();
        let ru = rank_unit(1250.0, &table);
        assert!((ru - 1.5).abs() < 1e-12);

        let position = ladder_position(ru, table.len());
        assert_eq!(position.index, Some(0));
        assert_eq!(table.rank_at(ru), Some("Silver"));
        assert!((position.progress - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_extrapolation_both_ends() {
        let table = five_step();
        assert!((rank_unit(3500.0, &table) - 6.0).abs() < 1e-12);
        assert!((rank_unit(-500.0, &table) + 0.5).abs() < 1e-12);
        assert_eq!(rank_unit(0.0, &table), 0.0);
    }

    #[test]
    fn test_single_threshold() {
        let table = ThresholdTable::new([("Only", 400.0)]).unwrap();
        assert_eq!(rank_unit(400.0, &table), 1.0);
        assert_eq!(rank_unit(800.0, &table), 2.0);
        assert_eq!(rank_unit(200.0, &table), 0.5);
    }

    #[test]
    fn test_non_finite_score_is_zero() {
        let table = five_step();
        assert_eq!(rank_unit(f64::NAN, &table), 0.0);
        assert_eq!(rank_unit(f64::INFINITY, &table), 0.0);
    }

    #[test]
    fn test_checked_rejects_unsorted() {
        assert!(rank_unit_checked(10.0, [("A", 5.0), ("B", 1.0)]).is_err());
        assert_eq!(rank_unit_checked(5.0, [("A", 5.0), ("B", 10.0)]).unwrap(), 1.0);
    }

    #[test]
    fn test_horizontal_position() {
        assert_eq!(horizontal_position(2.0, 0.0, 4.0, 800.0), 400.0);
        assert_eq!(horizontal_position(-1.0, 0.0, 4.0, 800.0), -200.0);
        assert_eq!(horizontal_position(2.0, 3.0, 3.0, 800.0), 0.0);
    }

    #[test]
    fn test_ladder_position_edges() {
        assert_eq!(ladder_position(0.25, 3), LadderPosition { index: None, progress: 25.0 });
        assert_eq!(ladder_position(-2.0, 3), LadderPosition { index: None, progress: 0.0 });
        assert_eq!(ladder_position(3.0, 3), LadderPosition { index: Some(2), progress: 100.0 });
        assert_eq!(ladder_position(9.5, 3), LadderPosition { index: Some(2), progress: 100.0 });
        assert_eq!(ladder_position(2.0, 3), LadderPosition { index: Some(1), progress: 0.0 });
    }

    proptest! {
        #[test]
        fn prop_threshold_maps_to_its_index(i in 0usize..5) {
            let table = five_step();
            let score = table.score_at(i).unwrap();
            prop_assert!((rank_unit(score, &table) - (i as f64 + 1.0)).abs() < 1e-12);
        }

        #[test]
        fn prop_monotonic(a in -5000.0f64..10000.0, b in -5000.0f64..10000.0) {
            let table = five_step();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(rank_unit(lo, &table) <= rank_unit(hi, &table));
        }

        #[test]
        fn prop_inverse_recovers_score(score in -5000.0f64..10000.0) {
            let table = five_step();
            let back = score_for_rank_unit(rank_unit(score, &table), &table);
            prop_assert!((back - score).abs() < 1e-6);
        }
    }
}
