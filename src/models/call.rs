// src/models/call.rs
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Lifecycle state of a call that is still in progress.
///
/// The manager interface also reports free-text channel states ("Up",
/// "Ring", ...). Those are kept lower-cased in `Other` so the dashboard
/// shows what the PBX reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallState {
    Ringing,
    Dialing,
    Active,
    Other(String),
}

impl CallState {
    /// Maps a channel state description such as `Ringing` or `Up`.
    pub fn from_description(description: &str) -> Option<Self> {
        let state = description.trim().to_lowercase();
        match state.as_str() {
            "" => None,
            "ringing" => Some(CallState::Ringing),
            "dialing" => Some(CallState::Dialing),
            "active" => Some(CallState::Active),
            _ => Some(CallState::Other(state)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CallState::Ringing => "ringing",
            CallState::Dialing => "dialing",
            CallState::Active => "active",
            CallState::Other(state) => state,
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CallState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Final classification of a finished call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallOutcome {
    Answered,
    NoAnswer,
    Error,
    Completed,
}

const ERROR_MARKERS: &[&str] = &[
    "404",
    "not found",
    "error",
    "failed",
    "congestion",
    "unavailable",
    "reject",
];
const NO_ANSWER_MARKERS: &[&str] = &["no answer", "busy", "cancel", "timeout"];
const ANSWERED_MARKERS: &[&str] = &["normal clearing", "answered"];

impl CallOutcome {
    /// Classifies hangup cause / dial status text. Failure markers win over
    /// no-answer markers, which win over success markers.
    pub fn classify(reason: &str) -> Self {
        let reason = reason.to_lowercase();
        let has = |markers: &[&str]| markers.iter().any(|m| reason.contains(m));

        if has(ERROR_MARKERS) {
            CallOutcome::Error
        } else if has(NO_ANSWER_MARKERS) {
            CallOutcome::NoAnswer
        } else if has(ANSWERED_MARKERS) {
            CallOutcome::Answered
        } else {
            CallOutcome::Completed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Answered => "answered",
            CallOutcome::NoAnswer => "no-answer",
            CallOutcome::Error => "error",
            CallOutcome::Completed => "completed",
        }
    }
}

/// A call in progress, as exposed to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveCall {
    pub id: String,
    pub from: String,
    pub to: String,
    pub state: CallState,
    pub start: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A finished call. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryCall {
    pub id: String,
    pub from: String,
    pub to: String,
    pub state: CallOutcome,
    pub end_reason: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_sec: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_precedence() {
        assert_eq!(CallOutcome::classify("Normal Clearing"), CallOutcome::Answered);
        assert_eq!(CallOutcome::classify("ANSWERED"), CallOutcome::Answered);
        assert_eq!(CallOutcome::classify("User busy"), CallOutcome::NoAnswer);
        assert_eq!(CallOutcome::classify("NO ANSWER"), CallOutcome::NoAnswer);
        assert_eq!(CallOutcome::classify("CANCEL"), CallOutcome::NoAnswer);
        assert_eq!(CallOutcome::classify("Number not found 404"), CallOutcome::Error);
        assert_eq!(CallOutcome::classify("CONGESTION"), CallOutcome::Error);
        // failure wins even when a success marker is present
        assert_eq!(CallOutcome::classify("answered then failed"), CallOutcome::Error);
        assert_eq!(CallOutcome::classify(""), CallOutcome::Completed);
        assert_eq!(CallOutcome::classify("16"), CallOutcome::Completed);
    }

    #[test]
    fn test_state_from_description() {
        assert_eq!(CallState::from_description("Ringing"), Some(CallState::Ringing));
        assert_eq!(CallState::from_description(" Up "), Some(CallState::Other("up".to_string())));
        assert_eq!(CallState::from_description("  "), None);
    }

    #[test]
    fn test_serialized_forms() {
        assert_eq!(serde_json::to_string(&CallOutcome::NoAnswer).unwrap(), "\"no-answer\"");
        assert_eq!(serde_json::to_string(&CallState::Dialing).unwrap(), "\"dialing\"");
        assert_eq!(
            serde_json::to_string(&CallState::Other("ring".to_string())).unwrap(),
            "\"ring\""
        );
    }
}
