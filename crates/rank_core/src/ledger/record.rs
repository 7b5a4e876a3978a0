use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Tag identifying one ranked session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A run as handed over by an ingestion source; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRun {
    pub drill_name: Option<String>,
    pub score: Option<f64>,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Unix milliseconds
    pub timestamp_ms: Option<i64>,
}

impl RawRun {
    pub fn new(drill_name: impl Into<String>, score: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            drill_name: Some(drill_name.into()),
            score: Some(score),
            difficulty: None,
            metadata: BTreeMap::new(),
            timestamp_ms: Some(timestamp.timestamp_millis()),
        }
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Why an incoming run was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    MissingDrill,
    MissingScore,
    NonFiniteScore,
    MissingTimestamp,
    UnknownDrill,
}

/// Stored, immutable run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub drill_name: String,
    pub score: f64,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    /// Ranked session active when the run was registered
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

impl RunRecord {
    pub(crate) fn from_raw(
        raw: RawRun,
        session_id: Option<SessionId>,
    ) -> Result<Self, RejectReason> {
        let drill_name = raw
            .drill_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(RejectReason::MissingDrill)?;
        let score = raw.score.ok_or(RejectReason::MissingScore)?;
        if !score.is_finite() {
            return Err(RejectReason::NonFiniteScore);
        }
        let timestamp = raw
            .timestamp_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or(RejectReason::MissingTimestamp)?;

        Ok(Self {
            drill_name,
            // -0.0 and 0.0 must share a dedup key
            score: if score == 0.0 { 0.0 } else { score },
            difficulty: raw.difficulty,
            metadata: raw.metadata,
            timestamp,
            session_id,
        })
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_rejections() {
        let missing_score = RawRun { drill_name: Some("Pasu".into()), timestamp_ms: Some(0), ..Default::default() };
        assert_eq!(RunRecord::from_raw(missing_score, None), Err(RejectReason::MissingScore));

        let blank_drill = RawRun {
            drill_name: Some("  ".into()),
            score: Some(1.0),
            timestamp_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(RunRecord::from_raw(blank_drill, None), Err(RejectReason::MissingDrill));

        let nan = RawRun {
            drill_name: Some("Pasu".into()),
            score: Some(f64::NAN),
            timestamp_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(RunRecord::from_raw(nan, None), Err(RejectReason::NonFiniteScore));

        let no_time = RawRun { drill_name: Some("Pasu".into()), score: Some(1.0), ..Default::default() };
        assert_eq!(RunRecord::from_raw(no_time, None), Err(RejectReason::MissingTimestamp));
    }

    #[test]
    fn test_from_raw_keeps_fields() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let raw = RawRun::new("Pasu", 812.5, at).with_difficulty("Novice").with_metadata("accuracy", "0.91");
        let id = SessionId::new();
        let record = RunRecord::from_raw(raw, Some(id)).unwrap();

        assert_eq!(record.drill_name, "Pasu");
        assert_eq!(record.timestamp_ms(), 1_700_000_000_123);
        assert_eq!(record.difficulty.as_deref(), Some("Novice"));
        assert_eq!(record.metadata.get("accuracy").map(String::as_str), Some("0.91"));
        assert_eq!(record.session_id, Some(id));
    }
}
