// src/ami/event.rs
//! Typed access to manager-interface events.
//!
//! Field names arrive in several spellings depending on the PBX version
//! (`Uniqueid`, `UniqueID`, `SourceChannel`, ...). Keys are folded to lower
//! case once when the event is built, and every logical field lists its
//! historical spellings in [`Field::aliases`].

use super::codec::AmiMessage;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Event,
    SubEvent,
    LinkedId,
    DestLinkedId,
    SrcLinkedId,
    UniqueId,
    DestUniqueId,
    SrcUniqueId,
    Channel,
    DestChannel,
    SrcChannel,
    CallerIdNum,
    ConnectedLineNum,
    Exten,
    ChannelStateDesc,
    DialString,
    DialStatus,
    Cause,
    CauseText,
    EndpointName,
    Uri,
    Device,
    DeviceState,
    Status,
    EndpointStatus,
    PeerStatus,
    State,
    ActiveChannels,
    ContactStatus,
}

impl Field {
    /// Lower-case spellings accepted for this field, in preference order.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Event => &["event"],
            Field::SubEvent => &["subevent"],
            Field::LinkedId => &["linkedid"],
            Field::DestLinkedId => &["destlinkedid"],
            Field::SrcLinkedId => &["srclinkedid"],
            Field::UniqueId => &["uniqueid"],
            Field::DestUniqueId => &["destuniqueid"],
            Field::SrcUniqueId => &["srcuniqueid"],
            Field::Channel => &["channel"],
            Field::DestChannel => &["destchannel", "destinationchannel"],
            Field::SrcChannel => &["srcchannel", "sourcechannel"],
            Field::CallerIdNum => &["calleridnum"],
            Field::ConnectedLineNum => &["connectedlinenum"],
            Field::Exten => &["exten"],
            Field::ChannelStateDesc => &["channelstatedesc"],
            Field::DialString => &["dialstring"],
            Field::DialStatus => &["dialstatus"],
            Field::Cause => &["cause"],
            Field::CauseText => &["cause-txt"],
            Field::EndpointName => &["endpointname", "endpoint", "aor", "objectname", "peer"],
            Field::Uri => &["uri", "contact"],
            Field::Device => &["device"],
            Field::DeviceState => &["devicestate"],
            Field::Status => &["status"],
            Field::EndpointStatus => &["endpointstatus"],
            Field::PeerStatus => &["peerstatus"],
            Field::State => &["state"],
            Field::ActiveChannels => &["activechannels"],
            Field::ContactStatus => &["contactstatus"],
        }
    }
}

/// Presence-bearing event families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceKind {
    ContactStatus,
    EndpointStatus,
    DeviceStateChange,
    PeerStatus,
    EndpointList,
}

impl PresenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PresenceKind::ContactStatus => "contactstatus",
            PresenceKind::EndpointStatus => "endpointstatus",
            PresenceKind::DeviceStateChange => "devicestatechange",
            PresenceKind::PeerStatus => "peerstatus",
            PresenceKind::EndpointList => "endpointlist",
        }
    }
}

/// Normalized event type driving the call state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ChannelCreated,
    DialBegin,
    StateChanged,
    BridgeEnter,
    BridgeLeave,
    Hangup,
    Presence(PresenceKind),
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct AmiEvent {
    fields: HashMap<String, String>,
}

impl AmiEvent {
    pub fn get(&self, field: Field) -> Option<&str> {
        field
            .aliases()
            .iter()
            .filter_map(|alias| self.fields.get(*alias))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// Field value or an empty string.
    pub fn value(&self, field: Field) -> &str {
        self.get(field).unwrap_or("")
    }

    /// First non-empty value among several logical fields.
    pub fn first_of(&self, fields: &[Field]) -> Option<&str> {
        fields.iter().find_map(|f| self.get(*f))
    }

    pub fn event_name(&self) -> Option<&str> {
        self.get(Field::Event)
    }

    pub fn kind(&self) -> EventKind {
        let name = self.value(Field::Event).to_lowercase();
        match name.as_str() {
            "newchannel" => EventKind::ChannelCreated,
            "dialbegin" => EventKind::DialBegin,
            // pre-13 PBX versions report dials as `Dial` with a sub-event
            "dial" if self.value(Field::SubEvent).eq_ignore_ascii_case("begin") => {
                EventKind::DialBegin
            }
            "newstate" => EventKind::StateChanged,
            "bridgeenter" => EventKind::BridgeEnter,
            "bridgeleave" => EventKind::BridgeLeave,
            "hangup" => EventKind::Hangup,
            "contactstatus" => EventKind::Presence(PresenceKind::ContactStatus),
            "endpointstatus" => EventKind::Presence(PresenceKind::EndpointStatus),
            "devicestatechange" => EventKind::Presence(PresenceKind::DeviceStateChange),
            "peerstatus" => EventKind::Presence(PresenceKind::PeerStatus),
            "endpointlist" => EventKind::Presence(PresenceKind::EndpointList),
            _ => EventKind::Other,
        }
    }

    /// Key grouping all legs of one logical call.
    ///
    /// Linked ids are preferred, then unique ids of either leg; events
    /// carrying neither fall back to the raw channel name.
    pub fn link_key(&self) -> Option<&str> {
        self.first_of(&[
            Field::LinkedId,
            Field::DestLinkedId,
            Field::SrcLinkedId,
            Field::UniqueId,
            Field::DestUniqueId,
            Field::SrcUniqueId,
        ])
        .or_else(|| self.first_of(&[Field::Channel, Field::DestChannel, Field::SrcChannel]))
    }

    /// Identity of the channel leg this event is about.
    pub fn channel_key(&self) -> Option<&str> {
        self.first_of(&[Field::UniqueId, Field::Channel])
    }
}

impl From<&AmiMessage> for AmiEvent {
    fn from(message: &AmiMessage) -> Self {
        let fields = message
            .iter()
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.to_string()))
            .collect();
        Self { fields }
    }
}

impl From<AmiMessage> for AmiEvent {
    fn from(message: AmiMessage) -> Self {
        Self::from(&message)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for AmiEvent {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let fields = iter
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_ascii_lowercase(), v.into()))
            .collect();
        Self { fields }
    }
}

/// Keeps digits and `+ * #` only.
pub fn clean_number(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '*' | '#'))
        .collect()
}

/// Like [`clean_number`], but dialplan pseudo-extensions count as empty.
pub fn clean_target(raw: &str) -> String {
    match raw.trim() {
        "s" | "h" | "i" => String::new(),
        other => clean_number(other),
    }
}

/// First destination of a dial string: `PJSIP/2601&PJSIP/2602,20` → `2601`.
pub fn parse_dial_target(raw: &str) -> String {
    let raw = raw.trim();
    let part = raw.split(',').next().unwrap_or("");
    let part = part.split('&').next().unwrap_or("");
    let part = match part.rsplit_once('/') {
        Some((_, tail)) => tail,
        None => part,
    };
    part.trim().to_string()
}

/// Peer name from a channel: `PJSIP/2601-0000002a` → `2601`.
pub fn channel_peer(channel: &str) -> String {
    let channel = channel.trim();
    let channel = match channel.split_once('/') {
        Some((_, rest)) => rest,
        None => channel,
    };
    let channel = channel.split('-').next().unwrap_or("");
    let channel = channel.split('@').next().unwrap_or("");
    channel.to_string()
}
