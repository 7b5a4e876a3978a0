use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use super::event::SessionEvent;
use super::selection::{pick_drills, Candidate};
use super::state::{RankedSession, RatingUpdate, SessionState, SessionStatus, SessionSummary};
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::ledger::{RunLedger, SessionId};
use crate::rating::{achieved_value, RatingEngine};
use crate::scale::rank_unit;

/// Persisted scheduler contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub state: SessionState,
    /// Played drills of recent sessions, oldest first
    #[serde(default)]
    pub recent_sessions: Vec<Vec<String>>,
}

/// Ranked session state machine.
///
/// Commands return the event they caused, or `None` when the call was not
/// legal in the current state and nothing changed.
pub struct SessionScheduler {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    state: SessionState,
    recent_sessions: VecDeque<Vec<String>>,
    rng: ChaCha8Rng,
}

impl SessionScheduler {
    pub fn new(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { config, clock, state: SessionState::Idle, recent_sessions: VecDeque::new(), rng }
    }

    /// Restore from a snapshot; an inconsistent state falls back to idle.
    pub fn with_snapshot(mut self, snapshot: SchedulerSnapshot) -> Self {
        if snapshot.state.is_consistent() {
            self.state = snapshot.state;
        } else {
            log::warn!("Discarding inconsistent session snapshot");
        }
        self.recent_sessions = snapshot.recent_sessions.into();
        self.trim_history();
        self
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            state: self.state.clone(),
            recent_sessions: self.recent_sessions.iter().cloned().collect(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    pub fn current_drill(&self) -> Option<&str> {
        match &self.state {
            SessionState::Active(session) => session.current_drill(),
            _ => None,
        }
    }

    /// Session that newly registered runs belong to.
    pub fn recording_session(&self) -> Option<SessionId> {
        match &self.state {
            SessionState::Active(session) | SessionState::Completed { session, .. } => {
                Some(session.id)
            }
            _ => None,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.state.elapsed_seconds(self.clock.now())
    }

    pub fn drill_elapsed_seconds(&self) -> f64 {
        self.state.drill_elapsed_seconds(self.clock.now())
    }

    pub fn drill_total_seconds(&self, drill: &str) -> f64 {
        self.state.drill_total_seconds(drill, self.clock.now())
    }

    pub fn recent_sessions(&self) -> impl Iterator<Item = &[String]> + '_ {
        self.recent_sessions.iter().map(Vec::as_slice)
    }

    /// Sessions since `drill` was played, 0 being the latest; `None` outside the window.
    fn recent_rank(&self, drill: &str) -> Option<usize> {
        self.recent_sessions
            .iter()
            .rev()
            .position(|played| played.iter().any(|d| d == drill))
    }

    fn select(
        &mut self,
        engine: &RatingEngine,
        ledger: &RunLedger,
        tier: &str,
        skip: &HashSet<&str>,
        count: usize,
    ) -> Vec<(String, f64)> {
        let Some(def) = engine.catalog().tier(tier) else {
            return Vec::new();
        };

        let candidates: Vec<Candidate> = def
            .drill_names()
            .filter(|d| !skip.contains(d))
            .map(|d| Candidate {
                drill: d.to_string(),
                rating: engine.current_rating(ledger, tier, d),
                recent_rank: self.recent_rank(d),
            })
            .collect();
        let ratings: BTreeMap<String, f64> =
            candidates.iter().map(|c| (c.drill.clone(), c.rating)).collect();

        let picked = pick_drills(candidates, count, &mut self.rng);
        log::debug!("Selected {:?} for tier '{}'", picked, tier);

        picked
            .into_iter()
            .map(|d| {
                let rating = ratings.get(&d).copied().unwrap_or(0.0);
                (d, rating)
            })
            .collect()
    }

    pub fn start_session(
        &mut self,
        engine: &RatingEngine,
        ledger: &RunLedger,
        tier: &str,
    ) -> Option<SessionEvent> {
        if !self.state.is_idle() {
            return None;
        }

        let picked = self.select(engine, ledger, tier, &HashSet::new(), self.config.sequence_length);
        if picked.is_empty() {
            return None;
        }

        let now = self.clock.now();
        let session = RankedSession {
            id: SessionId::new(),
            tier: tier.to_string(),
            sequence: picked.iter().map(|(d, _)| d.clone()).collect(),
            index: 0,
            started_at: now,
            entered_at: now,
            initial_estimates: picked.into_iter().collect(),
            played: BTreeSet::new(),
            drill_seconds: BTreeMap::new(),
        };
        log::info!(
            "Ranked session {} started on '{}' with {} drills",
            session.id,
            tier,
            session.sequence.len()
        );

        let event = SessionEvent::Started {
            session_id: session.id,
            tier: session.tier.clone(),
            sequence: session.sequence.clone(),
        };
        self.state = SessionState::Active(session);
        Some(event)
    }

    pub fn advance(&mut self) -> Option<SessionEvent> {
        let now = self.clock.now();
        let SessionState::Active(session) = &mut self.state else {
            return None;
        };

        session.bank_time(now);
        if let Some(drill) = session.current_drill().map(str::to_string) {
            session.played.insert(drill);
        }

        if session.index + 1 < session.sequence.len() {
            session.index += 1;
            return Some(SessionEvent::Advanced { index: session.index });
        }

        if let SessionState::Active(session) = std::mem::take(&mut self.state) {
            log::info!("Ranked session {} completed its sequence", session.id);
            self.state = SessionState::Completed { session, completed_at: now };
        }
        Some(SessionEvent::Completed)
    }

    pub fn retreat(&mut self) -> Option<SessionEvent> {
        let now = self.clock.now();
        let SessionState::Active(session) = &mut self.state else {
            return None;
        };
        if session.index == 0 {
            return None;
        }

        session.bank_time(now);
        session.index -= 1;
        Some(SessionEvent::Retreated { index: session.index })
    }

    pub fn extend_session(
        &mut self,
        engine: &RatingEngine,
        ledger: &RunLedger,
    ) -> Option<SessionEvent> {
        let (tier, skip) = match &self.state {
            SessionState::Completed { session, .. } => {
                let skip: HashSet<String> = session
                    .played
                    .iter()
                    .chain(session.sequence.iter())
                    .cloned()
                    .collect();
                (session.tier.clone(), skip)
            }
            _ => return None,
        };

        let skip_refs: HashSet<&str> = skip.iter().map(String::as_str).collect();
        let picked = self.select(engine, ledger, &tier, &skip_refs, self.config.extend_length);
        if picked.is_empty() {
            return None;
        }

        let now = self.clock.now();
        let SessionState::Completed { mut session, .. } = std::mem::take(&mut self.state) else {
            return None;
        };

        let first_new = session.sequence.len();
        let appended: Vec<String> = picked.iter().map(|(d, _)| d.clone()).collect();
        for (drill, rating) in picked {
            session.snapshot_estimate(&drill, rating);
            session.sequence.push(drill);
        }
        session.index = first_new;
        session.entered_at = now;

        log::info!("Ranked session {} extended with {:?}", session.id, appended);
        self.state = SessionState::Active(session);
        Some(SessionEvent::Extended { appended })
    }

    /// Finish the session and evolve every played drill's rating.
    pub fn end_session(
        &mut self,
        engine: &mut RatingEngine,
        ledger: &RunLedger,
    ) -> Option<SessionEvent> {
        let now = self.clock.now();
        let session = match std::mem::take(&mut self.state) {
            SessionState::Active(mut session) => {
                session.bank_time(now);
                if let Some(drill) = session.current_drill().map(str::to_string) {
                    if !ledger.session_scores(&session.id, &drill, &session.tier).is_empty() {
                        session.played.insert(drill);
                    }
                }
                session
            }
            SessionState::Completed { session, .. } => session,
            other => {
                self.state = other;
                return None;
            }
        };

        let updates = Self::evolve_played(&session, engine, ledger);
        let summary = SessionSummary { ended_at: now, updates };

        self.recent_sessions.push_back(session.played.iter().cloned().collect());
        self.trim_history();

        log::info!(
            "Ranked session {} ended: {} drills played, {} ratings evolved",
            session.id,
            session.played.len(),
            summary.updates.iter().filter(|u| !u.skipped()).count()
        );
        self.state = SessionState::Summary { session, summary: summary.clone() };
        Some(SessionEvent::Ended { summary })
    }

    fn evolve_played(
        session: &RankedSession,
        engine: &mut RatingEngine,
        ledger: &RunLedger,
    ) -> Vec<RatingUpdate> {
        let min_attempts = engine.config().min_session_attempts;
        let mut updates = Vec::with_capacity(session.played.len());

        for drill in &session.played {
            let Some(def) = engine.catalog().drill(&session.tier, drill) else {
                continue;
            };
            let values: Vec<f64> = ledger
                .session_scores(&session.id, drill, &session.tier)
                .into_iter()
                .map(|score| rank_unit(score, &def.thresholds))
                .collect();

            let initial = match session.initial_estimates.get(drill) {
                Some(value) => *value,
                None => engine.current_rating(ledger, &session.tier, drill),
            };
            let achieved = achieved_value(&values, min_attempts);
            let evolved = match achieved {
                Some(achieved) => {
                    let evolved = RatingEngine::evolved_value(initial, achieved);
                    engine.set_baseline(&session.tier, drill, evolved);
                    log::info!(
                        "Rating for '{}' evolved {:.3} -> {:.3} (achieved {:.3})",
                        drill,
                        initial,
                        evolved,
                        achieved
                    );
                    evolved
                }
                None => {
                    log::debug!(
                        "Skipping evolution for '{}': {} of {} attempts",
                        drill,
                        values.len(),
                        min_attempts
                    );
                    initial
                }
            };

            updates.push(RatingUpdate {
                drill: drill.clone(),
                attempts: values.len(),
                initial,
                achieved,
                evolved,
            });
        }
        updates
    }

    pub fn reset(&mut self) -> Option<SessionEvent> {
        match self.state.status() {
            SessionStatus::Completed | SessionStatus::Summary => {
                self.state = SessionState::Idle;
                Some(SessionEvent::Reset)
            }
            SessionStatus::Idle | SessionStatus::Active => None,
        }
    }

    fn trim_history(&mut self) {
        while self.recent_sessions.len() > self.config.anti_repetition_sessions {
            self.recent_sessions.pop_front();
        }
    }
}

impl std::fmt::Debug for SessionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScheduler")
            .field("config", &self.config)
            .field("state", &self.state.status())
            .field("recent_sessions", &self.recent_sessions.len())
            .finish()
    }
}
