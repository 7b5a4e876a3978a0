//! # Rank Core Configuration
//!
//! Every tunable lives here so hosts can ship a single JSON/YAML file.
//!
//! ```rust
//! use rank_core::config::RankConfig;
//!
//! let config = RankConfig::default();
//! let strict = RankConfig::strict();
//! assert!(config.validate_all().is_ok());
//! assert!(strict.validate_all().is_ok());
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::rating::{AggregationPolicy, DecayPolicy, MIN_SESSION_ATTEMPTS};

/// Run ledger settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(default)]
pub struct LedgerConfig {
    /// Runs of one drill and score closer than this are the same attempt (ms)
    #[validate(range(min = 1, max = 3_600_000))]
    pub dedup_window_ms: i64,
    /// Ingested runs held in memory before the ledger snapshot is rewritten
    #[validate(range(min = 1, max = 10_000))]
    pub persist_batch: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { dedup_window_ms: 1_000, persist_batch: 32 }
    }
}

/// Rating engine settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(default)]
pub struct RatingConfig {
    pub aggregation: AggregationPolicy,
    pub decay: DecayPolicy,
    /// Session attempts a drill needs before its rating may evolve
    #[validate(range(min = 1, max = 100))]
    pub min_session_attempts: usize,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            aggregation: AggregationPolicy::Mean,
            decay: DecayPolicy::default(),
            min_session_attempts: MIN_SESSION_ATTEMPTS,
        }
    }
}

/// Ranked session settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    /// Drills picked when a session starts
    #[validate(range(min = 1, max = 64))]
    pub sequence_length: usize,
    /// Drills appended per extension
    #[validate(range(min = 1, max = 64))]
    pub extend_length: usize,
    /// Recent sessions whose played drills are skipped
    #[validate(range(max = 32))]
    pub anti_repetition_sessions: usize,
    /// Fixed selection seed; entropy when absent
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { sequence_length: 6, extend_length: 3, anti_repetition_sessions: 2, seed: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(default)]
pub struct RankConfig {
    #[validate]
    pub ledger: LedgerConfig,
    #[validate]
    pub rating: RatingConfig,
    #[validate]
    pub session: SessionConfig,
}

impl RankConfig {
    /// Weakest subcategory decides, ratings fade twice as fast.
    pub fn strict() -> Self {
        let mut cfg = Self::default();
        cfg.rating.aggregation = AggregationPolicy::Minimum;
        cfg.rating.decay = DecayPolicy::Linear { ru_per_day: 0.02, max_total: 1.0 };
        cfg
    }

    /// Deterministic selection, no decay.
    pub fn for_tests(seed: u64) -> Self {
        let mut cfg = Self::default();
        cfg.rating.decay = DecayPolicy::None;
        cfg.session.seed = Some(seed);
        cfg
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate_all()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(yaml)?;
        cfg.validate_all()?;
        Ok(cfg)
    }

    /// Range checks plus policy parameter checks.
    pub fn validate_all(&self) -> Result<()> {
        self.validate()?;
        self.rating.decay.validate()?;
        Ok(())
    }

    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(RankConfig);
        serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
    }
}
