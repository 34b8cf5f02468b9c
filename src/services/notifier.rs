// src/services/notifier.rs
//! Change signalling for snapshot readers.
//!
//! Each subscriber owns a one-slot channel. A signal only means "something
//! changed"; if the slot is already full the new signal is dropped and the
//! reader picks up the latest state on its next snapshot anyway.

use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct Subscribers {
    sinks: HashMap<Uuid, mpsc::Sender<()>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self) -> (Uuid, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        let id = Uuid::new_v4();
        self.sinks.insert(id, tx);
        (id, rx)
    }

    /// Removes and closes a sink. Returns false if it was already gone.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        self.sinks.remove(id).is_some()
    }

    /// Sinks to signal once the caller has released its lock.
    pub fn sinks(&self) -> Vec<mpsc::Sender<()>> {
        self.sinks.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

/// Signals every sink without blocking. Returns how many accepted a signal.
pub fn notify(sinks: &[mpsc::Sender<()>]) -> usize {
    sinks
        .iter()
        .filter(|sink| match sink.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) | Err(TrySendError::Closed(())) => false,
        })
        .count()
}
