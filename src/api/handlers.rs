// src/api/handlers.rs
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::models::{ActiveCall, HealthResponse, HistoryCall, Presence, Snapshot};
use crate::services::CallTracker;
use std::sync::Arc;

/// Full snapshot stamped with the time it was produced. Also the payload of
/// every WebSocket text frame.
#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl From<Snapshot> for SnapshotResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            generated_at: Utc::now(),
            snapshot,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActiveCallsResponse {
    pub generated_at: DateTime<Utc>,
    pub active: Vec<ActiveCall>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub generated_at: DateTime<Utc>,
    pub history: Vec<HistoryCall>,
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub generated_at: DateTime<Utc>,
    pub presence: Vec<Presence>,
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "pbx-call-monitor".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn active_calls(tracker: web::Data<Arc<CallTracker>>) -> HttpResponse {
    let snapshot = tracker.snapshot().await;
    HttpResponse::Ok().json(ActiveCallsResponse {
        generated_at: Utc::now(),
        active: snapshot.active,
    })
}

pub async fn call_history(tracker: web::Data<Arc<CallTracker>>) -> HttpResponse {
    let snapshot = tracker.snapshot().await;
    HttpResponse::Ok().json(HistoryResponse {
        generated_at: Utc::now(),
        history: snapshot.history,
    })
}

pub async fn presence(tracker: web::Data<Arc<CallTracker>>) -> HttpResponse {
    let snapshot = tracker.snapshot().await;
    HttpResponse::Ok().json(PresenceResponse {
        generated_at: Utc::now(),
        presence: snapshot.presences,
    })
}

pub async fn snapshot(tracker: web::Data<Arc<CallTracker>>) -> HttpResponse {
    HttpResponse::Ok().json(SnapshotResponse::from(tracker.snapshot().await))
}

pub async fn stats(tracker: web::Data<Arc<CallTracker>>) -> HttpResponse {
    HttpResponse::Ok().json(tracker.stats().await)
}
