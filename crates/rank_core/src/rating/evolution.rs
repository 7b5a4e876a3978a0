//! Post-session rating evolution
//!
//! A rating only moves up, and only halfway toward a result the player has
//! reproduced: the third-best attempt of the session, not the single best.

/// Attempts a drill needs in one session before its rating may move.
pub const MIN_SESSION_ATTEMPTS: usize = 3;

/// `initial + max(0, achieved - initial) / 2`
pub fn evolved_value(initial: f64, achieved: f64) -> f64 {
    initial + (achieved - initial).max(0.0) / 2.0
}

/// The `rank`-th highest value (1-based), `None` when there are fewer values.
pub fn nth_highest(values: &[f64], rank: usize) -> Option<f64> {
    if rank == 0 || values.len() < rank {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.len() < rank {
        return None;
    }
    sorted.sort_by(|a, b| b.total_cmp(a));
    Some(sorted[rank - 1])
}

/// Value a session proved for a drill: the `min_attempts`-th best attempt.
pub fn achieved_value(session_values: &[f64], min_attempts: usize) -> Option<f64> {
    nth_highest(session_values, min_attempts.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_third_highest_example() {
        let attempts = [3.1, 2.9, 2.5, 1.0];
        let third = achieved_value(&attempts, MIN_SESSION_ATTEMPTS).unwrap();
        assert_eq!(third, 2.5);
        assert!((evolved_value(2.0, third) - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_attempts() {
        assert_eq!(achieved_value(&[4.0, 3.0], MIN_SESSION_ATTEMPTS), None);
        assert_eq!(achieved_value(&[], MIN_SESSION_ATTEMPTS), None);
        assert_eq!(nth_highest(&[1.0], 0), None);
    }

    #[test]
    fn test_no_regression() {
        assert_eq!(evolved_value(3.0, 1.0), 3.0);
        assert_eq!(evolved_value(3.0, 3.0), 3.0);
    }

    proptest! {
        #[test]
        fn prop_never_decreases(x in -10.0f64..10.0, y in -10.0f64..10.0) {
            prop_assert!(evolved_value(x, y) >= x);
        }

        #[test]
        fn prop_halfway_when_better(x in -10.0f64..10.0, d in 0.001f64..10.0) {
            let y = x + d;
            prop_assert!((evolved_value(x, y) - (x + y) / 2.0).abs() < 1e-9);
        }

        #[test]
        fn prop_unchanged_when_worse(x in -10.0f64..10.0, d in 0.0f64..10.0) {
            prop_assert_eq!(evolved_value(x, x - d), x);
        }
    }
}
