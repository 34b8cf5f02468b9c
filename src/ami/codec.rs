// src/ami/codec.rs
//! Framing for the manager interface's text protocol.
//!
//! A message is a run of `Key: Value` lines closed by a blank line:
//! ```text
//! Event: Newchannel
//! Channel: PJSIP/2601-00000001
//! Uniqueid: 1700000000.1
//!
//! ```
//! The banner line that opens a session is read by the connection before
//! any framing starts.

use bytes::BytesMut;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound for a single protocol line.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// One blank-line-terminated block, with keys in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmiMessage {
    fields: Vec<(String, String)>,
}

impl AmiMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// Case-insensitive lookup; the last occurrence of a repeated key wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Non-empty `Event` header, if this block is an event.
    pub fn event_type(&self) -> Option<&str> {
        self.get("Event").map(str::trim).filter(|v| !v.is_empty())
    }

    /// Non-empty `Response` header, if this block answers an action.
    pub fn response(&self) -> Option<&str> {
        self.get("Response").map(str::trim).filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AmiMessage {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut message = AmiMessage::new();
        for (k, v) in iter {
            message.insert(k, v);
        }
        message
    }
}

/// Outbound request (`Action: ...` block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmiAction {
    fields: Vec<(String, String)>,
}

impl AmiAction {
    pub fn new(action: &str) -> Self {
        Self {
            fields: vec![("Action".to_string(), action.to_string())],
        }
    }

    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn login(username: &str, secret: &str) -> Self {
        Self::new("Login")
            .field("Username", username)
            .field("Secret", secret)
            .field("Events", "on")
    }

    /// Startup inventory query; the PBX answers with one endpoint-list
    /// event per configured endpoint.
    pub fn pjsip_show_endpoints() -> Self {
        Self::new("PJSIPShowEndpoints")
    }

    pub fn name(&self) -> &str {
        &self.fields[0].1
    }

    /// Wire form: `Key: Value\r\n` per field, then a blank line.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.fields {
            // a stray line break would split the block
            let value = value.replace(['\r', '\n'], " ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }
}

/// Frames a stream already positioned past the banner.
#[derive(Debug, Default)]
pub struct AmiCodec {
    pending: AmiMessage,
}

impl AmiCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for AmiCodec {
    type Item = AmiMessage;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<AmiMessage>, io::Error> {
        loop {
            let Some(pos) = src.iter().position(|b| *b == b'\n') else {
                if src.len() > MAX_LINE_LENGTH {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "manager interface line too long",
                    ));
                }
                return Ok(None);
            };

            let raw = src.split_to(pos + 1);
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(|c| c == '\r' || c == '\n');

            if line.trim().is_empty() {
                if self.pending.is_empty() {
                    // keep-alive blank line between messages
                    continue;
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                if !key.is_empty() {
                    self.pending.insert(key, value.trim());
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<AmiMessage>, io::Error> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        // an unterminated block at EOF is incomplete; drop it
        src.clear();
        self.pending = AmiMessage::new();
        Ok(None)
    }
}

impl Encoder<AmiAction> for AmiCodec {
    type Error = io::Error;

    fn encode(&mut self, action: AmiAction, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.extend_from_slice(action.to_wire().as_bytes());
        Ok(())
    }
}
