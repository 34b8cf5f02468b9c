// src/websocket/handshake.rs
use crate::error::MonitorError;
use actix_web::http::header::{self, HeaderMap, HeaderName};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const SUPPORTED_VERSION: &str = "13";

/// `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.trim().as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// True if any comma-separated element of any `name` header equals `token`,
/// ignoring ASCII case.
pub fn header_has_token(headers: &HeaderMap, name: &HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|part| part.trim().eq_ignore_ascii_case(token))
}

/// Checks an upgrade request and returns the accept token for the 101
/// response.
pub fn validate_upgrade(headers: &HeaderMap) -> Result<String, MonitorError> {
    if !header_has_token(headers, &header::CONNECTION, "upgrade") {
        return Err(MonitorError::WebSocketHandshake(
            "missing Connection: Upgrade".to_string(),
        ));
    }
    if !header_has_token(headers, &header::UPGRADE, "websocket") {
        return Err(MonitorError::WebSocketHandshake(
            "missing Upgrade: websocket".to_string(),
        ));
    }

    let version = headers
        .get(header::SEC_WEBSOCKET_VERSION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("");
    if version != SUPPORTED_VERSION {
        return Err(MonitorError::WebSocketHandshake(format!(
            "unsupported version {:?}",
            version
        )));
    }

    let key = headers
        .get(header::SEC_WEBSOCKET_KEY)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| MonitorError::WebSocketHandshake("missing Sec-WebSocket-Key".to_string()))?;

    Ok(accept_key(key))
}
