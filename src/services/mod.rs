// src/services/mod.rs
pub mod call_tracker;
pub mod cdr_import;
pub mod history;
pub mod notifier;
pub mod presence;

pub use call_tracker::{fill_if_empty, CallTracker, Unsubscribe};
pub use history::{HistoryLimits, HistoryStore};
pub use notifier::{notify, Subscribers};
