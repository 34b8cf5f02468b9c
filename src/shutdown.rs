// src/shutdown.rs
//! Process shutdown: one signal cancels the shared token before the HTTP
//! server starts its graceful stop, so push sessions and the manager
//! interface client are already winding down while connections drain.

use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Waits for `signal`, cancels `shutdown`, then runs `stop_server`.
pub async fn cancel_on_signal<S, F>(signal: S, shutdown: CancellationToken, stop_server: F) -> F::Output
where
    S: Future,
    F: Future,
{
    signal.await;
    info!("🛑 Shutdown signal received");
    shutdown.cancel();
    stop_server.await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_token_cancelled_before_server_stop() {
        let shutdown = CancellationToken::new();
        let (trigger, signal) = oneshot::channel::<()>();
        let observed = shutdown.clone();

        let task = tokio::spawn(cancel_on_signal(
            async {
                let _ = signal.await;
            },
            shutdown.clone(),
            async move { observed.is_cancelled() },
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!shutdown.is_cancelled());

        trigger.send(()).unwrap();
        let cancelled_at_stop = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(cancelled_at_stop);
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_sessions_end_on_signal() {
        let shutdown = CancellationToken::new();
        let session = shutdown.child_token();
        let session_task = tokio::spawn(async move { session.cancelled().await });

        cancel_on_signal(async {}, shutdown.clone(), async {}).await;

        assert!(tokio::time::timeout(Duration::from_secs(1), session_task).await.is_ok());
    }
}
