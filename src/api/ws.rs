// src/api/ws.rs
//! Push feed of call snapshots over a hand-framed WebSocket.

use crate::api::handlers::SnapshotResponse;
use crate::error::MonitorError;
use crate::services::CallTracker;
use crate::websocket::{encode_frame, validate_upgrade, OpCode};
use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outbound frames buffered per session before the writer applies
/// backpressure.
const FRAME_BUFFER: usize = 16;

#[derive(Debug, Clone)]
pub struct WsSettings {
    pub ping_interval: Duration,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(25),
        }
    }
}

pub async fn calls_ws(
    req: HttpRequest,
    payload: web::Payload,
    tracker: web::Data<Arc<CallTracker>>,
    settings: web::Data<WsSettings>,
    shutdown: web::Data<CancellationToken>,
) -> Result<HttpResponse, MonitorError> {
    let accept = validate_upgrade(req.headers())?;

    let session_id = Uuid::new_v4();
    let client_ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    let cancel = shutdown.child_token();
    let (frames_tx, frames_rx) = mpsc::channel::<Bytes>(FRAME_BUFFER);

    // Inbound frames are not interpreted; the payload ending means the
    // client is gone.
    let client_gone = cancel.clone();
    actix_rt::spawn(async move {
        let mut payload = payload;
        while let Some(chunk) = payload.next().await {
            if chunk.is_err() {
                break;
            }
        }
        client_gone.cancel();
    });

    info!(session = %session_id, client = %client_ip, "🔌 WebSocket client connected");
    actix_rt::spawn(push_session(
        session_id,
        tracker.get_ref().clone(),
        frames_tx,
        settings.ping_interval,
        cancel,
    ));

    let body = futures::stream::unfold(frames_rx, |mut frames| async move {
        frames
            .recv()
            .await
            .map(|frame| (Ok::<_, std::io::Error>(frame), frames))
    });

    Ok(HttpResponse::build(StatusCode::SWITCHING_PROTOCOLS)
        .upgrade("websocket")
        .insert_header((header::SEC_WEBSOCKET_ACCEPT, accept))
        .streaming(body))
}

/// Sends the current snapshot, then one per change signal, plus pings,
/// until cancelled or the client stops reading.
async fn push_session(
    session_id: Uuid,
    tracker: Arc<CallTracker>,
    frames: mpsc::Sender<Bytes>,
    ping_interval: Duration,
    cancel: CancellationToken,
) {
    let (mut signals, unsubscribe) = tracker.subscribe().await;
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);

    if let Err(e) = push_snapshot(&tracker, &frames).await {
        debug!(session = %session_id, error = %e, "Initial snapshot not delivered");
    } else {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                signal = signals.recv() => {
                    if signal.is_none() {
                        break;
                    }
                    if let Err(e) = push_snapshot(&tracker, &frames).await {
                        debug!(session = %session_id, error = %e, "Snapshot push failed");
                        break;
                    }
                }
                _ = ping.tick() => {
                    if frames.send(encode_frame(OpCode::Ping, &[])).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    if !unsubscribe.unsubscribe().await {
        warn!(session = %session_id, "Subscriber was already removed");
    }
    info!(session = %session_id, "WebSocket client disconnected");
}

async fn push_snapshot(
    tracker: &CallTracker,
    frames: &mpsc::Sender<Bytes>,
) -> Result<(), MonitorError> {
    let payload = serde_json::to_vec(&SnapshotResponse::from(tracker.snapshot().await))?;
    frames
        .send(encode_frame(OpCode::Text, &payload))
        .await
        .map_err(|_| MonitorError::ConnectionClosed)
}
