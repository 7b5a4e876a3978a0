//! Rank tracker
//!
//! Owns the ledger, the rating engine and the session scheduler, wires them to
//! the host's clock and byte store, and tells subscribers about every change.

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::catalog::DrillCatalog;
use crate::clock::Clock;
use crate::config::RankConfig;
use crate::error::Result;
use crate::ledger::{IngestReport, LedgerSnapshot, RawRun, RunLedger};
use crate::rating::{EstimatedRank, RatingEngine, RatingSource, RatingsSnapshot, SubcategoryValue};
use crate::save::{self, KeyValueStore, LEDGER_KEY, RATINGS_KEY, SESSION_KEY};
use crate::session::{
    SchedulerSnapshot, SessionEvent, SessionScheduler, SessionState, SessionStatus, SessionSummary,
};

/// Callback invoked after every state-changing command.
pub type Subscriber = Box<dyn FnMut(&SessionEvent, &SessionState)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub struct RankTracker {
    catalog: Arc<DrillCatalog>,
    clock: Arc<dyn Clock>,
    store: Box<dyn KeyValueStore>,
    config: RankConfig,
    ledger: RunLedger,
    engine: RatingEngine,
    scheduler: SessionScheduler,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    /// Ingested runs not yet in the stored ledger snapshot
    unsaved_runs: usize,
}

impl RankTracker {
    /// Build a tracker and restore whatever the store holds.
    ///
    /// Only an invalid `config` is an error. Missing or unreadable snapshots
    /// fall back to an empty ledger, no baselines and an idle scheduler.
    pub fn new(
        catalog: Arc<DrillCatalog>,
        clock: Arc<dyn Clock>,
        store: Box<dyn KeyValueStore>,
        config: RankConfig,
    ) -> Result<Self> {
        config.validate_all()?;

        let ledger = match load::<LedgerSnapshot>(store.as_ref(), LEDGER_KEY) {
            Some(snapshot) => RunLedger::from_snapshot(config.ledger.clone(), snapshot),
            None => RunLedger::new(config.ledger.clone()),
        };

        let mut engine = RatingEngine::new(catalog.clone(), clock.clone(), config.rating.clone());
        if let Some(snapshot) = load::<RatingsSnapshot>(store.as_ref(), RATINGS_KEY) {
            engine = engine.with_snapshot(snapshot);
        }

        let mut scheduler = SessionScheduler::new(config.session.clone(), clock.clone());
        if let Some(snapshot) = load::<SchedulerSnapshot>(store.as_ref(), SESSION_KEY) {
            scheduler = scheduler.with_snapshot(snapshot);
        }

        log::info!(
            "Rank tracker ready: {} runs, session {:?}",
            ledger.len(),
            scheduler.status()
        );

        Ok(Self {
            catalog,
            clock,
            store,
            config,
            ledger,
            engine,
            scheduler,
            subscribers: Vec::new(),
            next_subscription: 0,
            unsaved_runs: 0,
        })
    }

    /// Flush pending runs and hand the store back, e.g. to rebuild a tracker on top of it.
    pub fn into_store(mut self) -> Box<dyn KeyValueStore> {
        self.flush();
        self.store
    }

    // ========== Queries ==========

    pub fn catalog(&self) -> &DrillCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    pub fn engine(&self) -> &RatingEngine {
        &self.engine
    }

    pub fn drill_estimate(&self, tier: &str, drill: &str) -> EstimatedRank {
        self.engine.drill_estimate(&self.ledger, tier, drill)
    }

    pub fn estimate_for_value(&self, value: f64, tier: &str) -> EstimatedRank {
        self.engine.estimate_for_value(value, tier)
    }

    pub fn holistic_estimate(&self, tier: &str) -> EstimatedRank {
        self.engine.holistic_estimate(&self.ledger, tier)
    }

    pub fn overall_rank(&self, tier: &str) -> EstimatedRank {
        self.engine.overall_rank(&self.ledger, tier)
    }

    pub fn current_rating(&self, tier: &str, drill: &str) -> f64 {
        self.engine.current_rating(&self.ledger, tier, drill)
    }

    pub fn subcategory_breakdown(&self, tier: &str, source: RatingSource) -> Vec<SubcategoryValue> {
        self.engine.subcategory_breakdown(&self.ledger, tier, source)
    }

    pub fn state(&self) -> &SessionState {
        self.scheduler.state()
    }

    pub fn status(&self) -> SessionStatus {
        self.scheduler.status()
    }

    pub fn current_drill(&self) -> Option<&str> {
        self.scheduler.current_drill()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.scheduler.elapsed_seconds()
    }

    pub fn drill_elapsed_seconds(&self) -> f64 {
        self.scheduler.drill_elapsed_seconds()
    }

    pub fn drill_total_seconds(&self, drill: &str) -> f64 {
        self.scheduler.drill_total_seconds(drill)
    }

    // ========== Commands ==========

    /// Ingest runs, tagging them with the running session if there is one.
    ///
    /// The ledger snapshot is rewritten once `ledger.persist_batch` runs have
    /// piled up, and on every session command.
    pub fn register_runs(&mut self, runs: impl IntoIterator<Item = RawRun>) -> IngestReport {
        let session = self.scheduler.recording_session();
        let report = self.ledger.register_runs(&self.catalog, runs, session);

        self.unsaved_runs += report.accepted + report.rejected;
        if self.unsaved_runs >= self.config.ledger.persist_batch {
            self.persist(&[LEDGER_KEY]);
        }
        if report.accepted > 0 {
            self.notify(SessionEvent::RunsRegistered {
                accepted: report.accepted,
                duplicates: report.duplicates,
                rejected: report.rejected,
            });
        }
        report
    }

    pub fn start_session(&mut self, tier: &str) -> bool {
        let event = self.scheduler.start_session(&self.engine, &self.ledger, tier);
        self.commit(event, &[SESSION_KEY])
    }

    pub fn advance(&mut self) -> bool {
        let event = self.scheduler.advance();
        self.commit(event, &[SESSION_KEY])
    }

    pub fn retreat(&mut self) -> bool {
        let event = self.scheduler.retreat();
        self.commit(event, &[SESSION_KEY])
    }

    pub fn extend_session(&mut self) -> bool {
        let event = self.scheduler.extend_session(&self.engine, &self.ledger);
        self.commit(event, &[SESSION_KEY])
    }

    /// End the session and evolve ratings; `None` when no session can end.
    pub fn end_session(&mut self) -> Option<SessionSummary> {
        let event = self.scheduler.end_session(&mut self.engine, &self.ledger)?;
        let summary = match &event {
            SessionEvent::Ended { summary } => Some(summary.clone()),
            _ => None,
        };
        self.commit(Some(event), &[RATINGS_KEY, SESSION_KEY]);
        summary
    }

    pub fn reset(&mut self) -> bool {
        let event = self.scheduler.reset();
        self.commit(event, &[SESSION_KEY])
    }

    /// Write the ledger snapshot if any runs are pending.
    pub fn flush(&mut self) {
        if self.unsaved_runs > 0 {
            self.persist(&[LEDGER_KEY]);
        }
    }

    // ========== Observers ==========

    pub fn subscribe(&mut self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn commit(&mut self, event: Option<SessionEvent>, keys: &[&str]) -> bool {
        match event {
            Some(event) => {
                self.flush();
                self.persist(keys);
                self.notify(event);
                true
            }
            None => false,
        }
    }

    fn notify(&mut self, event: SessionEvent) {
        log::debug!("Session event: {}", event.name());
        let state = self.scheduler.state();
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&event, state);
        }
    }

    fn persist(&mut self, keys: &[&str]) {
        let now_ms = self.clock.now().timestamp_millis();
        for &key in keys {
            let result = match key {
                LEDGER_KEY => {
                    let written =
                        save::write_snapshot(self.store.as_mut(), key, &self.ledger.snapshot(), now_ms);
                    if written.is_ok() {
                        self.unsaved_runs = 0;
                    }
                    written
                }
                RATINGS_KEY => {
                    save::write_snapshot(self.store.as_mut(), key, &self.engine.snapshot(), now_ms)
                }
                SESSION_KEY => {
                    save::write_snapshot(self.store.as_mut(), key, &self.scheduler.snapshot(), now_ms)
                }
                _ => Ok(()),
            };
            if let Err(err) = result {
                log::warn!("Failed to persist '{}': {}", key, err);
            }
        }
    }
}

/// Read a snapshot, treating anything unreadable as absent.
fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match save::read_snapshot::<T>(store, key) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("Discarding unreadable snapshot '{}': {}", key, err);
            None
        }
    }
}

impl std::fmt::Debug for RankTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankTracker")
            .field("runs", &self.ledger.len())
            .field("engine", &self.engine)
            .field("scheduler", &self.scheduler)
            .field("subscribers", &self.subscribers.len())
            .field("unsaved_runs", &self.unsaved_runs)
            .finish()
    }
}
