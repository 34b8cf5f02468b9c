// src/services/presence.rs
//! Endpoint presence derived from status events.

use crate::ami::event::{clean_number, AmiEvent, Field, PresenceKind};
use crate::models::PresenceState;

const IN_USE_MARKERS: &[&str] = &["inuse", "busy", "onhold", "ring", "dial"];
const DISCONNECTED_MARKERS: &[&str] = &[
    "unreachable",
    "offline",
    "unavailable",
    "unregistered",
    "nonqualified",
    "unknown",
    "lagged",
    "removed",
    "invalid",
    "failed",
];
const CONNECTED_MARKERS: &[&str] = &[
    "notinuse",
    "reachable",
    "online",
    "registered",
    "avail",
    "ok",
    "ready",
];

/// Canonical endpoint id for a status event, trying the endpoint name,
/// then the contact URI, the channel, and finally the device.
pub fn presence_id(event: &AmiEvent) -> Option<String> {
    let candidates = [
        event.get(Field::EndpointName),
        event.get(Field::Uri),
        event.first_of(&[Field::Channel, Field::DestChannel, Field::SrcChannel]),
        event.get(Field::Device),
    ];

    candidates
        .into_iter()
        .flatten()
        .map(clean_presence_id)
        .find(|id| !id.is_empty())
}

/// Reduces `<sip:2601@10.0.0.5:5060>`, `PJSIP/2601-0000001` or
/// `2601@default` to `2601`.
pub fn clean_presence_id(raw: &str) -> String {
    let mut id = raw.trim();
    if id.is_empty() {
        return String::new();
    }

    if let (Some(open), Some(close)) = (id.find('<'), id.rfind('>')) {
        if open < close {
            id = &id[open + 1..close];
        }
    }

    if id.contains(':') {
        if let Some(at) = id.find('@').filter(|at| *at > 0) {
            if let Some(colon) = id[..at].rfind(':') {
                id = &id[colon + 1..at];
            }
        }
    }

    if let Some((_, rest)) = id.split_once('/') {
        id = rest;
    }
    id = id.split('-').next().unwrap_or("");
    id = id.split('@').next().unwrap_or("");

    let number = clean_number(id);
    if number.is_empty() {
        id.trim().to_string()
    } else {
        number
    }
}

/// State and detail for a status event.
///
/// A positive active-channel count always means in use. Otherwise the first
/// status-like field is matched against keyword families; the negated forms
/// (`notinuse`, `unreachable`, ...) are checked before the words they
/// contain.
pub fn presence_status(kind: PresenceKind, event: &AmiEvent) -> (PresenceState, String) {
    let detail = event
        .first_of(&[
            Field::ActiveChannels,
            Field::Cause,
            Field::SubEvent,
            Field::Uri,
            Field::ContactStatus,
        ])
        .unwrap_or("")
        .to_string();

    let active_channels = event
        .get(Field::ActiveChannels)
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(0);
    if active_channels > 0 {
        return (PresenceState::InUse, detail);
    }

    let raw = event
        .first_of(&[
            Field::DeviceState,
            Field::Status,
            Field::EndpointStatus,
            Field::PeerStatus,
            Field::State,
            Field::ContactStatus,
        ])
        .unwrap_or(kind.as_str());

    (classify_status(raw), detail)
}

/// Maps a raw status word to a presence state, ignoring case, spaces,
/// underscores and hyphens.
///
/// Negated forms are checked before the words they contain: "Not in use"
/// is connected rather than in use, and "Unreachable", "Unregistered" and
/// "Unavailable" are disconnected even though they contain "reachable",
/// "registered" and "avail". Unrecognized text counts as disconnected.
pub fn classify_status(raw: &str) -> PresenceState {
    let normalized: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect();
    let has = |markers: &[&str]| markers.iter().any(|m| normalized.contains(m));

    if normalized.contains("notinuse") {
        PresenceState::Connected
    } else if has(IN_USE_MARKERS) {
        PresenceState::InUse
    } else if has(DISCONNECTED_MARKERS) {
        PresenceState::Disconnected
    } else if has(CONNECTED_MARKERS) {
        PresenceState::Connected
    } else {
        PresenceState::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(pairs: &[(&str, &str)]) -> AmiEvent {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_clean_presence_id_forms() {
        assert_eq!(clean_presence_id("<sip:2601@10.0.0.5:5060>"), "2601");
        assert_eq!(clean_presence_id("sip:2602@pbx.local"), "2602");
        assert_eq!(clean_presence_id("PJSIP/2603-0000001a"), "2603");
        assert_eq!(clean_presence_id("2604@default"), "2604");
        assert_eq!(clean_presence_id("reception"), "reception");
        assert_eq!(clean_presence_id("   "), "");
    }

    #[test]
    fn test_presence_id_candidate_order() {
        let ev = event(&[("Channel", "PJSIP/2605-01"), ("Device", "PJSIP/9999")]);
        assert_eq!(presence_id(&ev).as_deref(), Some("2605"));

        let ev = event(&[("AOR", "2601"), ("URI", "sip:2602@host")]);
        assert_eq!(presence_id(&ev).as_deref(), Some("2601"));

        assert_eq!(presence_id(&event(&[("Event", "PeerStatus")])), None);
    }

    #[test]
    fn test_active_channels_means_in_use() {
        let ev = event(&[("ActiveChannels", "2"), ("DeviceState", "Not in use")]);
        let (state, detail) = presence_status(PresenceKind::EndpointList, &ev);
        assert_eq!(state, PresenceState::InUse);
        assert_eq!(detail, "2");
    }

    #[test]
    fn test_status_keyword_families() {
        assert_eq!(classify_status("INUSE"), PresenceState::InUse);
        assert_eq!(classify_status("Ringing"), PresenceState::InUse);
        assert_eq!(classify_status("NOT_INUSE"), PresenceState::Connected);
        assert_eq!(classify_status("Reachable"), PresenceState::Connected);
        assert_eq!(classify_status("Registered"), PresenceState::Connected);
        assert_eq!(classify_status("Unreachable"), PresenceState::Disconnected);
        assert_eq!(classify_status("Unavailable"), PresenceState::Disconnected);
        assert_eq!(classify_status("Lagged"), PresenceState::Disconnected);
        assert_eq!(classify_status("something else"), PresenceState::Disconnected);
    }

    #[test]
    fn test_negated_forms_checked_first() {
        assert_eq!(classify_status("Not in use"), PresenceState::Connected);
        assert_eq!(classify_status("not-in-use"), PresenceState::Connected);
        assert_eq!(classify_status("Unreachable"), PresenceState::Disconnected);
        assert_eq!(classify_status("Unregistered"), PresenceState::Disconnected);
        assert_eq!(classify_status("Unavailable"), PresenceState::Disconnected);
        assert_eq!(classify_status("Available"), PresenceState::Connected);
    }

    #[test]
    fn test_contact_status_field_is_a_status() {
        let ev = event(&[("AOR", "2601"), ("ContactStatus", "Unreachable")]);
        let (state, detail) = presence_status(PresenceKind::ContactStatus, &ev);
        assert_eq!(state, PresenceState::Disconnected);
        assert_eq!(detail, "Unreachable");
    }

    #[test]
    fn test_event_type_used_when_no_status() {
        let ev = event(&[("Endpoint", "2601")]);
        let (state, detail) = presence_status(PresenceKind::EndpointList, &ev);
        assert_eq!(state, PresenceState::Disconnected);
        assert!(detail.is_empty());
    }
}
