use chrono::{DateTime, Utc};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::record::{RawRun, RejectReason, RunRecord, SessionId};
use crate::catalog::DrillCatalog;
use crate::config::LedgerConfig;

/// Outcome of one `register_runs` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub reasons: BTreeMap<RejectReason, usize>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.accepted + self.duplicates + self.rejected
    }

    fn reject(&mut self, reason: RejectReason) {
        self.rejected += 1;
        *self.reasons.entry(reason).or_default() += 1;
    }
}

/// Serializable ledger contents; the dedup index is rebuilt on restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub records: Vec<RunRecord>,
    #[serde(default)]
    pub rejected_total: u64,
}

type DedupKey = (String, u64);

/// Append-only, deduplicated run history.
#[derive(Debug, Clone, Default)]
pub struct RunLedger {
    config: LedgerConfig,
    records: Vec<RunRecord>,
    /// (drill, score bits) -> stored timestamps in ms
    index: FxHashMap<DedupKey, Vec<i64>>,
    rejected_total: u64,
}

impl RunLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn from_snapshot(config: LedgerConfig, snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new(config);
        ledger.rejected_total = snapshot.rejected_total;
        for record in snapshot.records {
            // A tampered snapshot may carry duplicates; keep the first.
            if ledger.is_duplicate(&record) {
                continue;
            }
            ledger.insert(record);
        }
        ledger
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot { records: self.records.clone(), rejected_total: self.rejected_total }
    }

    /// Ingest runs, tagging accepted ones with `session`.
    ///
    /// Duplicates are judged against the whole history, not just the session.
    pub fn register_runs(
        &mut self,
        catalog: &DrillCatalog,
        runs: impl IntoIterator<Item = RawRun>,
        session: Option<SessionId>,
    ) -> IngestReport {
        let mut report = IngestReport::default();

        for raw in runs {
            let record = match RunRecord::from_raw(raw, session) {
                Ok(record) => record,
                Err(reason) => {
                    report.reject(reason);
                    continue;
                }
            };
            if !catalog.knows_drill(&record.drill_name) {
                report.reject(RejectReason::UnknownDrill);
                continue;
            }
            if self.is_duplicate(&record) {
                report.duplicates += 1;
                continue;
            }

            self.insert(record);
            report.accepted += 1;
        }

        self.rejected_total += report.rejected as u64;
        log::debug!(
            "Ledger ingest: {} accepted, {} duplicate, {} rejected ({} stored)",
            report.accepted,
            report.duplicates,
            report.rejected,
            self.records.len()
        );
        report
    }

    fn dedup_key(record: &RunRecord) -> DedupKey {
        (record.drill_name.clone(), record.score.to_bits())
    }

    fn is_duplicate(&self, record: &RunRecord) -> bool {
        let window = self.config.dedup_window_ms.max(1);
        let at = record.timestamp_ms();
        self.index
            .get(&Self::dedup_key(record))
            .map(|stamps| stamps.iter().any(|&t| (t - at).abs() < window))
            .unwrap_or(false)
    }

    fn insert(&mut self, record: RunRecord) {
        self.index.entry(Self::dedup_key(&record)).or_default().push(record.timestamp_ms());
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunRecord> + '_ {
        self.records.iter()
    }

    /// Lifetime count of malformed runs turned away.
    pub fn rejected_total(&self) -> u64 {
        self.rejected_total
    }

    pub fn session_runs(&self, session: &SessionId) -> Vec<&RunRecord> {
        self.records.iter().filter(|r| r.session_id.as_ref() == Some(session)).collect()
    }

    /// Scores of one drill within one session, in registration order.
    pub fn session_scores(&self, session: &SessionId, drill: &str, tier: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.session_id.as_ref() == Some(session) && r.drill_name == drill)
            .filter(|r| counts_for_tier(r, tier))
            .map(|r| r.score)
            .collect()
    }

    pub fn runs_for_drill<'a>(&'a self, drill: &'a str) -> impl Iterator<Item = &'a RunRecord> + 'a {
        self.records.iter().filter(move |r| r.drill_name == drill)
    }

    /// Highest-scoring run of the drill in `tier`; the earliest wins a tie.
    pub fn best_for_drill(&self, drill: &str, tier: &str) -> Option<&RunRecord> {
        let runs = self.records.iter().filter(|r| r.drill_name == drill && counts_for_tier(r, tier));
        runs.fold(None, |best: Option<&RunRecord>, run| match best {
            Some(b) if b.score >= run.score => Some(b),
            _ => Some(run),
        })
    }

    pub fn last_played(&self, drill: &str) -> Option<DateTime<Utc>> {
        self.runs_for_drill(drill).map(|r| r.timestamp).max()
    }

    /// Full reset; the only way records ever leave the ledger.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
        self.rejected_total = 0;
    }
}

/// Runs without a difficulty count for every tier.
fn counts_for_tier(record: &RunRecord, tier: &str) -> bool {
    record.difficulty.as_deref().map_or(true, |difficulty| difficulty == tier)
}
