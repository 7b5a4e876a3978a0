use serde::{Deserialize, Serialize};

use super::state::SessionSummary;
use crate::ledger::SessionId;

/// Change notification sent to subscribers after a successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    Started { session_id: SessionId, tier: String, sequence: Vec<String> },
    Advanced { index: usize },
    Retreated { index: usize },
    Completed,
    Extended { appended: Vec<String> },
    Ended { summary: SessionSummary },
    Reset,
    RunsRegistered { accepted: usize, duplicates: usize, rejected: usize },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Started { .. } => "started",
            SessionEvent::Advanced { .. } => "advanced",
            SessionEvent::Retreated { .. } => "retreated",
            SessionEvent::Completed => "completed",
            SessionEvent::Extended { .. } => "extended",
            SessionEvent::Ended { .. } => "ended",
            SessionEvent::Reset => "reset",
            SessionEvent::RunsRegistered { .. } => "runs_registered",
        }
    }
}
