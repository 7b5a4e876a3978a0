//! Ranked session state
//!
//! `SessionState` is a tagged union keyed by status, so an idle scheduler
//! cannot carry a drill sequence and a summary only exists after `end_session`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::clock::seconds_between;
use crate::ledger::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Idle,
    Active,
    Completed,
    Summary,
}

/// Everything a non-idle session carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSession {
    pub id: SessionId,
    pub tier: String,
    pub sequence: Vec<String>,
    pub index: usize,
    pub started_at: DateTime<Utc>,
    /// When the current index was entered
    pub entered_at: DateTime<Utc>,
    /// Ratings at the moment each drill joined the session; never rewritten
    pub initial_estimates: BTreeMap<String, f64>,
    pub played: BTreeSet<String>,
    /// Seconds spent on each drill, excluding the live stint on the current one
    pub drill_seconds: BTreeMap<String, f64>,
}

impl RankedSession {
    pub fn current_drill(&self) -> Option<&str> {
        self.sequence.get(self.index).map(String::as_str)
    }

    /// Close the live stint on the current drill.
    pub(crate) fn bank_time(&mut self, now: DateTime<Utc>) {
        let spent = seconds_between(self.entered_at, now);
        if let Some(drill) = self.sequence.get(self.index) {
            *self.drill_seconds.entry(drill.clone()).or_default() += spent;
        }
        self.entered_at = now;
    }

    /// Snapshot a drill's rating unless it already has one.
    pub(crate) fn snapshot_estimate(&mut self, drill: &str, rating: f64) {
        self.initial_estimates.entry(drill.to_string()).or_insert(rating);
    }

    fn is_consistent(&self) -> bool {
        !self.sequence.is_empty()
            && self.index < self.sequence.len()
            && self.sequence.iter().all(|d| self.initial_estimates.contains_key(d))
    }
}

/// Result of rating evolution for one played drill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub drill: String,
    pub attempts: usize,
    pub initial: f64,
    /// Third-best session RU; `None` when evolution was skipped
    pub achieved: Option<f64>,
    pub evolved: f64,
}

impl RatingUpdate {
    pub fn skipped(&self) -> bool {
        self.achieved.is_none()
    }

    pub fn delta(&self) -> f64 {
        self.evolved - self.initial
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub ended_at: DateTime<Utc>,
    pub updates: Vec<RatingUpdate>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Active(RankedSession),
    Completed { session: RankedSession, completed_at: DateTime<Utc> },
    Summary { session: RankedSession, summary: SessionSummary },
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Idle => SessionStatus::Idle,
            SessionState::Active(_) => SessionStatus::Active,
            SessionState::Completed { .. } => SessionStatus::Completed,
            SessionState::Summary { .. } => SessionStatus::Summary,
        }
    }

    pub fn session(&self) -> Option<&RankedSession> {
        match self {
            SessionState::Idle => None,
            SessionState::Active(session)
            | SessionState::Completed { session, .. }
            | SessionState::Summary { session, .. } => Some(session),
        }
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        match self {
            SessionState::Summary { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Seconds since the session started, frozen once it completes or ends.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        match self {
            SessionState::Idle => 0.0,
            SessionState::Active(session) => seconds_between(session.started_at, now),
            SessionState::Completed { session, completed_at } => {
                seconds_between(session.started_at, *completed_at)
            }
            SessionState::Summary { session, summary } => {
                seconds_between(session.started_at, summary.ended_at)
            }
        }
    }

    /// Seconds since the current drill was entered; 0 unless active.
    pub fn drill_elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        match self {
            SessionState::Active(session) => seconds_between(session.entered_at, now),
            _ => 0.0,
        }
    }

    /// Total seconds on `drill` this session, including the live stint.
    pub fn drill_total_seconds(&self, drill: &str, now: DateTime<Utc>) -> f64 {
        let Some(session) = self.session() else {
            return 0.0;
        };
        let banked = session.drill_seconds.get(drill).copied().unwrap_or(0.0);
        let live = match self {
            SessionState::Active(s) if s.current_drill() == Some(drill) => {
                seconds_between(s.entered_at, now)
            }
            _ => 0.0,
        };
        banked + live
    }

    /// Structural sanity check for restored snapshots.
    pub fn is_consistent(&self) -> bool {
        self.session().map(RankedSession::is_consistent).unwrap_or(true)
    }
}
