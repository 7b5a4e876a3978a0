//! Drill selection for ranked sessions
//!
//! Weak drills are drawn more often. Drills from the last few sessions are
//! excluded, even if that shortens the sequence; they come back only when
//! nothing else is left, so a session can always start.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::HashSet;

/// A drill eligible for selection and its current rating.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub drill: String,
    pub rating: f64,
    /// Sessions since it was last played inside the repetition window, `None` if outside
    pub recent_rank: Option<usize>,
}

/// Selection weight: 1 for the weakest candidate, shrinking as the gap grows.
fn weight(rating: f64, floor: f64) -> f64 {
    let w = 1.0 / (1.0 + (rating - floor).max(0.0));
    if w.is_finite() && w > 0.0 {
        w
    } else {
        1.0
    }
}

/// Weighted draw without replacement.
fn draw_weighted<R: Rng + ?Sized>(mut pool: Vec<Candidate>, count: usize, rng: &mut R) -> Vec<String> {
    let floor = pool.iter().map(|c| c.rating).fold(f64::INFINITY, f64::min);
    let mut picked = Vec::with_capacity(count.min(pool.len()));

    while picked.len() < count && !pool.is_empty() {
        let weights: Vec<f64> = pool.iter().map(|c| weight(c.rating, floor)).collect();
        let idx = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => 0,
        };
        picked.push(pool.swap_remove(idx).drill);
    }
    picked
}

/// Pick up to `count` drills.
///
/// Only fresh candidates (outside the repetition window) are drawn, by weight.
/// When there are none, held-back candidates are used instead, longest-unplayed
/// first, then weakest.
pub fn pick_drills<R: Rng + ?Sized>(candidates: Vec<Candidate>, count: usize, rng: &mut R) -> Vec<String> {
    let mut seen = HashSet::new();
    let (fresh, mut held): (Vec<Candidate>, Vec<Candidate>) = candidates
        .into_iter()
        .filter(|c| seen.insert(c.drill.clone()))
        .partition(|c| c.recent_rank.is_none());

    if !fresh.is_empty() {
        return draw_weighted(fresh, count, rng);
    }

    held.sort_by(|a, b| {
        b.recent_rank
            .cmp(&a.recent_rank)
            .then(a.rating.total_cmp(&b.rating))
            .then(a.drill.cmp(&b.drill))
    });
    held.into_iter().take(count).map(|c| c.drill).collect()
}
