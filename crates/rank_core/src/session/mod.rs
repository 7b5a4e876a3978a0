//! Ranked session scheduling
//!
//! A finite-state machine that sequences drills for a tier, times them and
//! evolves ratings when the session ends.

pub mod event;
pub mod scheduler;
pub mod selection;
pub mod state;

pub use event::SessionEvent;
pub use scheduler::{SchedulerSnapshot, SessionScheduler};
pub use selection::{pick_drills, Candidate};
pub use state::{RankedSession, RatingUpdate, SessionState, SessionStatus, SessionSummary};
