// src/websocket/mod.rs
//! Server side of the RFC 6455 upgrade handshake and frame encoding.
//!
//! The HTTP layer only needs `validate_upgrade` to get the accept token and
//! `encode_frame` to write server frames, so either half can be replaced by
//! a library without touching call tracking.

pub mod frame;
pub mod handshake;

pub use frame::{encode_frame, OpCode};
pub use handshake::{accept_key, header_has_token, validate_upgrade, WEBSOCKET_GUID};
