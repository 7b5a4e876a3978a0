use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::estimate::EstimatedRank;
use super::evolution;
use super::policy::{Aggregation, Decay};
use crate::catalog::{DrillCatalog, TierDef};
use crate::clock::Clock;
use crate::config::RatingConfig;
use crate::ledger::RunLedger;
use crate::scale::{rank_unit, ThresholdTable};

/// Evolved rating of one drill in one tier, stored with its update time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub value: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub tier: String,
    pub drill: String,
    pub baseline: Baseline,
}

/// Serializable form of every stored baseline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingsSnapshot {
    pub baselines: Vec<BaselineEntry>,
}

/// Which per-drill value feeds an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingSource {
    /// RU of the best recorded score
    Observed,
    /// Evolved baseline with decay, falling back to the observed value
    Ranked,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubcategoryValue {
    pub name: String,
    pub category: Option<String>,
    /// Best drill value, `None` when no drill of the subcategory has a run
    pub value: Option<f64>,
}

/// Derives drill and tier ratings from the ledger.
///
/// Holds no cache: every query recomputes from the ledger, the catalog,
/// the stored baselines and the clock's current day.
pub struct RatingEngine {
    catalog: Arc<DrillCatalog>,
    clock: Arc<dyn Clock>,
    config: RatingConfig,
    baselines: BTreeMap<(String, String), Baseline>,
}

impl RatingEngine {
    pub fn new(catalog: Arc<DrillCatalog>, clock: Arc<dyn Clock>, config: RatingConfig) -> Self {
        Self { catalog, clock, config, baselines: BTreeMap::new() }
    }

    pub fn with_snapshot(mut self, snapshot: RatingsSnapshot) -> Self {
        for entry in snapshot.baselines {
            if entry.baseline.value.is_finite() {
                self.baselines.insert((entry.tier, entry.drill), entry.baseline);
            }
        }
        self
    }

    pub fn snapshot(&self) -> RatingsSnapshot {
        RatingsSnapshot {
            baselines: self
                .baselines
                .iter()
                .map(|((tier, drill), baseline)| BaselineEntry {
                    tier: tier.clone(),
                    drill: drill.clone(),
                    baseline: *baseline,
                })
                .collect(),
        }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    pub fn catalog(&self) -> &DrillCatalog {
        &self.catalog
    }

    pub fn drill_continuous_value(score: f64, thresholds: &ThresholdTable) -> f64 {
        rank_unit(score, thresholds)
    }

    pub fn evolved_value(initial: f64, achieved: f64) -> f64 {
        evolution::evolved_value(initial, achieved)
    }

    /// RU of the best recorded score, `None` without runs or for a drill outside the tier.
    pub fn observed_value(&self, ledger: &RunLedger, tier: &str, drill: &str) -> Option<f64> {
        let def = self.catalog.drill(tier, drill)?;
        let best = ledger.best_for_drill(drill, tier)?;
        Some(rank_unit(best.score, &def.thresholds))
    }

    pub fn drill_estimate(&self, ledger: &RunLedger, tier: &str, drill: &str) -> EstimatedRank {
        let Some(def) = self.catalog.drill(tier, drill) else {
            return EstimatedRank::unranked();
        };
        match self.observed_value(ledger, tier, drill) {
            Some(value) => EstimatedRank::on_ladder(value, def.thresholds.names()),
            None => EstimatedRank::unranked(),
        }
    }

    /// Describe any RU value with the tier's aggregate ladder.
    pub fn estimate_for_value(&self, value: f64, tier: &str) -> EstimatedRank {
        match self.catalog.tier(tier) {
            Some(def) => EstimatedRank::on_ladder(value, def.rank_ladder.iter().map(String::as_str)),
            None => EstimatedRank::unranked(),
        }
    }

    pub fn baseline(&self, tier: &str, drill: &str) -> Option<Baseline> {
        self.baselines.get(&(tier.to_string(), drill.to_string())).copied()
    }

    pub fn set_baseline(&mut self, tier: &str, drill: &str, value: f64) {
        if !value.is_finite() {
            return;
        }
        let baseline = Baseline { value, updated_at: self.clock.now() };
        self.baselines.insert((tier.to_string(), drill.to_string()), baseline);
    }

    pub fn clear_baselines(&mut self) {
        self.baselines.clear();
    }

    /// Stored baseline after lazy decay up to today.
    pub fn decayed_baseline(&self, tier: &str, drill: &str) -> Option<f64> {
        let baseline = self.baseline(tier, drill)?;
        let days = (self.clock.now() - baseline.updated_at).num_days();
        Some(self.config.decay.decayed(baseline.value, days))
    }

    /// Ranked rating of a drill: decayed baseline, else observed RU, else 0.
    pub fn current_rating(&self, ledger: &RunLedger, tier: &str, drill: &str) -> f64 {
        self.decayed_baseline(tier, drill)
            .or_else(|| self.observed_value(ledger, tier, drill))
            .unwrap_or(0.0)
    }

    fn drill_value(
        &self,
        ledger: &RunLedger,
        tier: &str,
        drill: &str,
        source: RatingSource,
    ) -> Option<f64> {
        let observed = self.observed_value(ledger, tier, drill)?;
        match source {
            RatingSource::Observed => Some(observed),
            RatingSource::Ranked => Some(self.decayed_baseline(tier, drill).unwrap_or(observed)),
        }
    }

    pub fn subcategory_breakdown(
        &self,
        ledger: &RunLedger,
        tier: &str,
        source: RatingSource,
    ) -> Vec<SubcategoryValue> {
        let Some(def) = self.catalog.tier(tier) else {
            return Vec::new();
        };
        def.subcategories
            .iter()
            .map(|sub| SubcategoryValue {
                name: sub.name.clone(),
                category: sub.category.clone(),
                value: sub
                    .drills
                    .iter()
                    .filter_map(|d| self.drill_value(ledger, tier, &d.name, source))
                    .reduce(f64::max),
            })
            .collect()
    }

    fn aggregate(&self, ledger: &RunLedger, def: &TierDef, source: RatingSource) -> EstimatedRank {
        let breakdown = self.subcategory_breakdown(ledger, &def.name, source);
        let values: Option<Vec<f64>> = breakdown.iter().map(|s| s.value).collect();

        match values {
            Some(values) if !values.is_empty() => {
                let value = self.config.aggregation.reduce(&values);
                EstimatedRank::on_ladder(value, def.rank_ladder.iter().map(String::as_str))
            }
            // Any empty subcategory keeps the whole tier unranked.
            _ => EstimatedRank::unranked(),
        }
    }

    /// Tier aggregate over the best recorded scores.
    pub fn holistic_estimate(&self, ledger: &RunLedger, tier: &str) -> EstimatedRank {
        match self.catalog.tier(tier) {
            Some(def) => self.aggregate(ledger, def, RatingSource::Observed),
            None => EstimatedRank::unranked(),
        }
    }

    /// Tier aggregate over ranked (evolved, decayed) ratings.
    pub fn overall_rank(&self, ledger: &RunLedger, tier: &str) -> EstimatedRank {
        match self.catalog.tier(tier) {
            Some(def) => self.aggregate(ledger, def, RatingSource::Ranked),
            None => EstimatedRank::unranked(),
        }
    }
}

impl std::fmt::Debug for RatingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingEngine")
            .field("config", &self.config)
            .field("baselines", &self.baselines.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{novice_catalog, two_tier_catalog};
    use crate::clock::ManualClock;
    use crate::config::LedgerConfig;
    use crate::ledger::RawRun;
    use crate::rating::{AggregationPolicy, DecayPolicy};
    use chrono::Duration;

    struct Fixture {
        clock: Arc<ManualClock>,
        catalog: Arc<DrillCatalog>,
        ledger: RunLedger,
    }

    fn fixture() -> Fixture {
        Fixture {
            clock: Arc::new(ManualClock::at_millis(1_700_000_000_000)),
            catalog: Arc::new(novice_catalog()),
            ledger: RunLedger::new(LedgerConfig::default()),
        }
    }

    fn engine(fx: &Fixture, config: RatingConfig) -> RatingEngine {
        RatingEngine::new(fx.catalog.clone(), fx.clock.clone(), config)
    }

    fn record(fx: &mut Fixture, drill: &str, score: f64, offset_secs: i64) {
        let at = fx.clock.now() + Duration::seconds(offset_secs);
        fx.ledger.register_runs(&fx.catalog, [RawRun::new(drill, score, at)], None);
    }

    #[test]
    fn test_drill_estimate_uses_best_score() {
        let mut fx = fixture();
        // Pasu thresholds: 100 / 200 / 300 / 400
        record(&mut fx, "Pasu", 150.0, 0);
        record(&mut fx, "Pasu", 250.0, 10);
        record(&mut fx, "Pasu", 120.0, 20);
        let engine = engine(&fx, RatingConfig::default());

        let est = engine.drill_estimate(&fx.ledger, "Novice", "Pasu");
        assert_eq!(est.rank_name, "Bronze");
        assert!((est.continuous_value - 2.5).abs() < 1e-12);
        assert!((est.progress_to_next - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_drill_estimate_scoped_to_run_tier() {
        let mut fx = fixture();
        fx.catalog = Arc::new(two_tier_catalog());
        let now = fx.clock.now();
        fx.ledger.register_runs(
            &fx.catalog,
            [
                RawRun::new("Pasu", 150.0, now).with_difficulty("Novice"),
                RawRun::new("Pasu", 900.0, now + Duration::seconds(10)).with_difficulty("Elite"),
            ],
            None,
        );
        let engine = engine(&fx, RatingConfig::default());

        let novice = engine.drill_estimate(&fx.ledger, "Novice", "Pasu");
        assert!((novice.continuous_value - 1.5).abs() < 1e-12);
        assert_eq!(novice.rank_name, "Iron");

        let elite = engine.drill_estimate(&fx.ledger, "Elite", "Pasu");
        assert!((elite.continuous_value - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_drill_estimate_defaults() {
        let fx = fixture();
        let engine = engine(&fx, RatingConfig::default());
        assert_eq!(engine.drill_estimate(&fx.ledger, "Novice", "Pasu"), EstimatedRank::unranked());
        assert_eq!(engine.drill_estimate(&fx.ledger, "Elite", "Pasu"), EstimatedRank::unranked());
        assert_eq!(engine.drill_estimate(&fx.ledger, "Novice", "Nope"), EstimatedRank::unranked());
    }

    #[test]
    fn test_estimate_for_value() {
        let fx = fixture();
        let engine = engine(&fx, RatingConfig::default());
        let est = engine.estimate_for_value(3.75, "Novice");
        assert_eq!(est.rank_name, "Silver");
        assert!((est.progress_to_next - 75.0).abs() < 1e-9);
        assert!(!engine.estimate_for_value(3.75, "Elite").is_ranked());
    }

    #[test]
    fn test_holistic_requires_every_subcategory() {
        let mut fx = fixture();
        record(&mut fx, "Pasu", 400.0, 0);
        record(&mut fx, "Cloud", 4000.0, 10);
        let engine = engine(&fx, RatingConfig::default());

        // Speed Switching still empty
        assert!(!engine.holistic_estimate(&fx.ledger, "Novice").is_ranked());

        record(&mut fx, "Domi", 50.0, 20);
        let est = engine.holistic_estimate(&fx.ledger, "Novice");
        // subcategory values: 4.0, 4.0, 1.0 -> mean 3.0
        assert!((est.continuous_value - 3.0).abs() < 1e-12);
        assert_eq!(est.rank_name, "Silver");
    }

    #[test]
    fn test_minimum_policy() {
        let mut fx = fixture();
        record(&mut fx, "Pasu", 400.0, 0);
        record(&mut fx, "Cloud", 4000.0, 10);
        record(&mut fx, "Domi", 50.0, 20);
        let config = RatingConfig { aggregation: AggregationPolicy::Minimum, ..RatingConfig::default() };
        let engine = engine(&fx, config);

        let est = engine.holistic_estimate(&fx.ledger, "Novice");
        assert_eq!(est.continuous_value, 1.0);
        assert_eq!(est.rank_name, "Iron");
    }

    #[test]
    fn test_subcategory_takes_best_drill() {
        let mut fx = fixture();
        record(&mut fx, "Pasu", 100.0, 0);
        record(&mut fx, "Popcorn", 600.0, 10);
        let engine = engine(&fx, RatingConfig::default());

        let breakdown = engine.subcategory_breakdown(&fx.ledger, "Novice", RatingSource::Observed);
        assert_eq!(breakdown[0].value, Some(3.0));
        assert_eq!(breakdown[0].category.as_deref(), Some("Clicking"));
        assert_eq!(breakdown[1].value, None);
    }

    #[test]
    fn test_current_rating_prefers_baseline_and_decays() {
        let mut fx = fixture();
        record(&mut fx, "Pasu", 200.0, 0);
        let config = RatingConfig {
            decay: DecayPolicy::Linear { ru_per_day: 0.1, max_total: 0.5 },
            ..RatingConfig::default()
        };
        let mut engine = engine(&fx, config);

        assert_eq!(engine.current_rating(&fx.ledger, "Novice", "Pasu"), 2.0);

        engine.set_baseline("Novice", "Pasu", 2.4);
        assert_eq!(engine.current_rating(&fx.ledger, "Novice", "Pasu"), 2.4);

        fx.clock.advance_days(3);
        assert!((engine.current_rating(&fx.ledger, "Novice", "Pasu") - 2.1).abs() < 1e-9);

        fx.clock.advance_days(30);
        assert!((engine.current_rating(&fx.ledger, "Novice", "Pasu") - 1.9).abs() < 1e-9);

        // reads are pure: asking twice gives the same answer
        let once = engine.current_rating(&fx.ledger, "Novice", "Pasu");
        assert_eq!(once, engine.current_rating(&fx.ledger, "Novice", "Pasu"));
    }

    #[test]
    fn test_overall_rank_uses_ranked_values() {
        let mut fx = fixture();
        record(&mut fx, "Pasu", 100.0, 0);
        record(&mut fx, "Cloud", 1000.0, 10);
        record(&mut fx, "Domi", 50.0, 20);
        let mut engine = engine(&fx, RatingConfig { decay: DecayPolicy::None, ..RatingConfig::default() });

        assert_eq!(engine.overall_rank(&fx.ledger, "Novice").continuous_value, 1.0);

        engine.set_baseline("Novice", "Pasu", 4.0);
        let overall = engine.overall_rank(&fx.ledger, "Novice");
        assert!((overall.continuous_value - 2.0).abs() < 1e-12);
        assert_eq!(engine.holistic_estimate(&fx.ledger, "Novice").continuous_value, 1.0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let fx = fixture();
        let mut engine = engine(&fx, RatingConfig::default());
        engine.set_baseline("Novice", "Cloud", 3.3);

        let restored = RatingEngine::new(fx.catalog.clone(), fx.clock.clone(), RatingConfig::default())
            .with_snapshot(engine.snapshot());
        assert_eq!(restored.baseline("Novice", "Cloud").map(|b| b.value), Some(3.3));
    }
}
