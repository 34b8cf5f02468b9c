// src/models/mod.rs
pub mod call;
pub mod presence;

pub use call::{ActiveCall, CallOutcome, CallState, HistoryCall};
pub use presence::{Presence, PresenceState};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time copy of everything the tracker knows. Owned data only, so
/// it can be handed to any reader without holding the tracker lock.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub active: Vec<ActiveCall>,
    pub history: Vec<HistoryCall>,
    #[serde(rename = "presence")]
    pub presences: Vec<Presence>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerStats {
    pub active_calls: usize,
    pub history_calls: usize,
    pub presence_entries: usize,
    pub subscribers: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}
