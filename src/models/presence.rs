// src/models/presence.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceState {
    Connected,
    InUse,
    Disconnected,
}

impl PresenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceState::Connected => "connected",
            PresenceState::InUse => "in-use",
            PresenceState::Disconnected => "disconnected",
        }
    }
}

/// Last known reachability of one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presence {
    pub id: String,
    pub state: PresenceState,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detail: String,
    pub updated: DateTime<Utc>,
}

impl Presence {
    /// True when `other` carries the same state and detail.
    pub fn same_status(&self, other: &Presence) -> bool {
        self.state == other.state && self.detail == other.detail
    }
}
