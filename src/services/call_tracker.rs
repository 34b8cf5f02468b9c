// src/services/call_tracker.rs
use crate::ami::event::{channel_peer, clean_number, clean_target, parse_dial_target, AmiEvent, EventKind, Field};
use crate::ami::EventSink;
use crate::error::MonitorError;
use crate::models::{ActiveCall, CallOutcome, CallState, HistoryCall, Presence, Snapshot, TrackerStats};
use crate::services::cdr_import;
use crate::services::history::{HistoryLimits, HistoryStore};
use crate::services::notifier::{notify, Subscribers};
use crate::services::presence::{presence_id, presence_status};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Fields consulted for the end reason of a hangup, in preference order.
const END_REASON_FIELDS: &[Field] = &[Field::CauseText, Field::Cause, Field::DialStatus];

/// Sets `slot` to the first non-empty candidate, but only while `slot` is
/// still empty. Returns true when it wrote something.
pub fn fill_if_empty<I>(slot: &mut String, candidates: I) -> bool
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    if !slot.trim().is_empty() {
        return false;
    }
    let found = candidates
        .into_iter()
        .map(|c| c.as_ref().trim().to_string())
        .find(|c| !c.is_empty());
    match found {
        Some(value) => {
            *slot = value;
            true
        }
        None => false,
    }
}

#[derive(Debug)]
struct TrackedCall {
    call: ActiveCall,
    legs: HashSet<String>,
}

impl TrackedCall {
    fn new(id: &str, now: DateTime<Utc>) -> Self {
        Self {
            call: ActiveCall {
                id: id.to_string(),
                from: String::new(),
                to: String::new(),
                state: CallState::Ringing,
                start: now,
                updated: now,
            },
            legs: HashSet::new(),
        }
    }

    fn add_leg(&mut self, leg: Option<&str>) -> bool {
        match leg {
            Some(leg) => {
                self.legs.insert(leg.to_string());
                true
            }
            None => false,
        }
    }

    fn finish(self, event: &AmiEvent, now: DateTime<Utc>) -> HistoryCall {
        let end_reason = event.first_of(END_REASON_FIELDS).unwrap_or("").to_string();
        let reason_text = END_REASON_FIELDS
            .iter()
            .filter_map(|f| event.get(*f))
            .collect::<Vec<_>>()
            .join(" ");

        HistoryCall {
            id: self.call.id,
            from: self.call.from,
            to: self.call.to,
            state: CallOutcome::classify(&reason_text),
            end_reason,
            start: self.call.start,
            end: now,
            duration_sec: (now - self.call.start).num_seconds().max(0),
        }
    }
}

#[derive(Debug)]
struct TrackerState {
    active: HashMap<String, TrackedCall>,
    history: HistoryStore,
    presence: HashMap<String, Presence>,
    updated: DateTime<Utc>,
    subscribers: Subscribers,
}

impl TrackerState {
    fn ensure_call(&mut self, key: &str, now: DateTime<Utc>) -> (&mut TrackedCall, bool) {
        let created = !self.active.contains_key(key);
        let call = self
            .active
            .entry(key.to_string())
            .or_insert_with(|| TrackedCall::new(key, now));
        (call, created)
    }

    /// Folds one event into the state. Returns true if anything changed.
    fn apply(&mut self, event: &AmiEvent, now: DateTime<Utc>) -> bool {
        let kind = event.kind();
        let link_key = event.link_key().map(str::to_string);

        let changed = match (kind, link_key.as_deref()) {
            (EventKind::Presence(presence_kind), _) => {
                let Some(id) = presence_id(event) else {
                    return false;
                };
                let (state, detail) = presence_status(presence_kind, event);
                let next = Presence {
                    id: id.clone(),
                    state,
                    detail,
                    updated: now,
                };
                let unchanged = self
                    .presence
                    .get(&id)
                    .map_or(false, |prev| prev.same_status(&next));
                if unchanged {
                    false
                } else {
                    debug!(endpoint = %id, state = state.as_str(), "Presence changed");
                    self.presence.insert(id, next);
                    true
                }
            }
            (EventKind::Other, _) | (_, None) => return false,
            (EventKind::ChannelCreated, Some(key)) => {
                let (call, created) = self.ensure_call(key, now);
                let mut changed = created;
                changed |= call.add_leg(event.channel_key());
                changed |= fill_if_empty(
                    &mut call.call.from,
                    [
                        clean_number(event.value(Field::CallerIdNum)),
                        clean_number(&channel_peer(event.value(Field::Channel))),
                    ],
                );
                changed |= fill_if_empty(
                    &mut call.call.to,
                    [
                        clean_target(event.value(Field::Exten)),
                        clean_number(event.value(Field::ConnectedLineNum)),
                    ],
                );
                if let Some(state) = CallState::from_description(event.value(Field::ChannelStateDesc)) {
                    call.call.state = state;
                    changed = true;
                }
                changed
            }
            (EventKind::DialBegin, Some(key)) => {
                let (call, _) = self.ensure_call(key, now);
                fill_if_empty(
                    &mut call.call.from,
                    [
                        clean_number(event.value(Field::CallerIdNum)),
                        clean_number(&channel_peer(event.value(Field::SrcChannel))),
                    ],
                );
                fill_if_empty(
                    &mut call.call.to,
                    [
                        clean_number(&parse_dial_target(event.value(Field::DialString))),
                        clean_number(&channel_peer(event.value(Field::DestChannel))),
                    ],
                );
                call.add_leg(event.get(Field::SrcUniqueId));
                call.add_leg(event.get(Field::DestUniqueId));
                call.call.state = CallState::Dialing;
                true
            }
            (EventKind::StateChanged, Some(key)) => {
                let (call, created) = self.ensure_call(key, now);
                match CallState::from_description(event.value(Field::ChannelStateDesc)) {
                    Some(state) => {
                        call.call.state = state;
                        true
                    }
                    None => created,
                }
            }
            (EventKind::BridgeEnter, Some(key)) => {
                let (call, _) = self.ensure_call(key, now);
                call.call.state = CallState::Active;
                call.add_leg(event.channel_key());
                true
            }
            (EventKind::BridgeLeave, Some(key)) => match self.active.get_mut(key) {
                Some(call) => {
                    call.call.state = CallState::Ringing;
                    true
                }
                None => false,
            },
            (EventKind::Hangup, Some(key)) => self.hang_up(key, event, now),
        };

        if changed {
            if let Some(call) = link_key.as_deref().and_then(|key| self.active.get_mut(key)) {
                call.call.updated = now;
            }
            self.history.prune(now);
            self.updated = now;
        }
        changed
    }

    fn hang_up(&mut self, key: &str, event: &AmiEvent, now: DateTime<Utc>) -> bool {
        let Some(call) = self.active.get_mut(key) else {
            return false;
        };

        let mut changed = false;
        if let Some(leg) = event.channel_key() {
            call.legs.remove(leg);
            changed = true;
        }
        if !call.legs.is_empty() {
            return changed;
        }

        if let Some(finished) = self.active.remove(key) {
            let record = finished.finish(event, now);
            info!(
                call_id = %record.id,
                from = %record.from,
                to = %record.to,
                outcome = record.state.as_str(),
                duration_sec = record.duration_sec,
                "Call finished"
            );
            self.history.record(record, now);
            changed = true;
        }
        changed
    }

    fn snapshot(&self) -> Snapshot {
        let mut active: Vec<ActiveCall> = self.active.values().map(|c| c.call.clone()).collect();
        active.sort_by(|a, b| b.start.cmp(&a.start).then_with(|| a.id.cmp(&b.id)));

        let mut presences: Vec<Presence> = self.presence.values().cloned().collect();
        presences.sort_by(|a, b| {
            a.state
                .as_str()
                .cmp(b.state.as_str())
                .then_with(|| a.id.cmp(&b.id))
        });

        Snapshot {
            active,
            history: self.history.to_vec(),
            presences,
            updated_at: self.updated,
        }
    }
}

/// Owner of all live call, history, and presence state.
///
/// Every mutation goes through one write-lock section; signal delivery to
/// subscribers happens after the lock is released.
pub struct CallTracker {
    limits: HistoryLimits,
    state: RwLock<TrackerState>,
}

impl CallTracker {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            limits,
            state: RwLock::new(TrackerState {
                active: HashMap::new(),
                history: HistoryStore::new(limits),
                presence: HashMap::new(),
                updated: Utc::now(),
                subscribers: Subscribers::new(),
            }),
        }
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    pub async fn fold_event(&self, event: &AmiEvent) -> bool {
        self.fold_event_at(event, Utc::now()).await
    }

    /// Same as [`fold_event`](Self::fold_event) with an explicit clock.
    pub async fn fold_event_at(&self, event: &AmiEvent, now: DateTime<Utc>) -> bool {
        let sinks = {
            let mut state = self.state.write().await;
            if !state.apply(event, now) {
                return false;
            }
            debug!(
                event = event.event_name().unwrap_or(""),
                link_key = event.link_key().unwrap_or(""),
                active = state.active.len(),
                "Event folded"
            );
            state.subscribers.sinks()
        };
        notify(&sinks);
        true
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.snapshot()
    }

    pub async fn stats(&self) -> TrackerStats {
        let state = self.state.read().await;
        TrackerStats {
            active_calls: state.active.len(),
            history_calls: state.history.len(),
            presence_entries: state.presence.len(),
            subscribers: state.subscribers.len(),
            updated_at: state.updated,
        }
    }

    /// Registers a change listener.
    pub async fn subscribe(self: &Arc<Self>) -> (mpsc::Receiver<()>, Unsubscribe) {
        let (id, signals) = self.state.write().await.subscribers.register();
        debug!(subscriber = %id, "Subscriber registered");
        let handle = Unsubscribe {
            id,
            tracker: Arc::clone(self),
        };
        (signals, handle)
    }

    /// Replaces history with the records of a CDR export. A missing file
    /// imports nothing and leaves history untouched.
    pub async fn import_cdr(&self, path: &Path) -> Result<usize, MonitorError> {
        let now = Utc::now();
        let cutoff = self.limits.cutoff(now);
        let owned_path = path.to_path_buf();

        let loaded = tokio::task::spawn_blocking(move || cdr_import::load_cdr_file(&owned_path, cutoff, now))
            .await
            .map_err(|e| MonitorError::Internal(format!("CDR import task failed: {}", e)))??;
        let Some(records) = loaded else {
            return Ok(0);
        };

        let (count, sinks) = {
            let mut state = self.state.write().await;
            state.history.replace(records, now);
            state.updated = now;
            (state.history.len(), state.subscribers.sinks())
        };
        notify(&sinks);

        info!(path = %path.display(), imported = count, "CDR history loaded");
        Ok(count)
    }
}

#[async_trait]
impl EventSink for CallTracker {
    async fn handle_event(&self, event: AmiEvent) {
        self.fold_event(&event).await;
    }
}

/// Handle returned by [`CallTracker::subscribe`]. Unsubscribing more than
/// once is a no-op.
pub struct Unsubscribe {
    id: Uuid,
    tracker: Arc<CallTracker>,
}

impl Unsubscribe {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Removes and closes the sink. Returns false if it was already removed.
    pub async fn unsubscribe(&self) -> bool {
        let removed = self.tracker.state.write().await.subscribers.remove(&self.id);
        if removed {
            debug!(subscriber = %self.id, "Subscriber removed");
        }
        removed
    }
}
