// src/ami/mod.rs
pub mod client;
pub mod codec;
pub mod connection;
pub mod event;

pub use client::AmiClient;
pub use codec::{AmiAction, AmiCodec, AmiMessage};
pub use connection::AmiConnection;
pub use event::{AmiEvent, EventKind, Field, PresenceKind};

use async_trait::async_trait;

/// Consumer of events read off the manager interface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn handle_event(&self, event: AmiEvent);
}
