// src/ami/client.rs
use crate::ami::codec::AmiAction;
use crate::ami::connection::AmiConnection;
use crate::ami::event::AmiEvent;
use crate::ami::EventSink;
use crate::config::AmiServer;
use crate::error::MonitorError;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Keeps one manager-interface session alive until cancelled, reconnecting
/// after a fixed delay whenever a session ends.
pub struct AmiClient {
    server: AmiServer,
    sink: Arc<dyn EventSink>,
}

impl AmiClient {
    pub fn new(server: AmiServer, sink: Arc<dyn EventSink>) -> Self {
        Self { server, sink }
    }

    /// Runs until `cancel` fires. Only a missing address or credentials is
    /// an error; connection and login failures are logged and retried.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), MonitorError> {
        let addr = self.server.addr.trim().to_string();
        if addr.is_empty() {
            return Err(MonitorError::Config("manager interface address is empty".to_string()));
        }
        if self.server.username.is_empty() || self.server.secret.is_empty() {
            return Err(MonitorError::Config("manager interface credentials are missing".to_string()));
        }

        loop {
            info!(addr = %addr, "Connecting to manager interface");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.session(&addr) => match result {
                    Ok(()) => info!(addr = %addr, "Manager interface connection closed"),
                    Err(e) => error!(addr = %addr, error = %e, "Manager interface session failed"),
                },
            }

            warn!(
                addr = %addr,
                "Reconnecting to manager interface in {:?}...",
                self.server.reconnect_delay
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(self.server.reconnect_delay) => {}
            }
        }

        info!(addr = %addr, "🛑 Manager interface client stopped");
        Ok(())
    }

    async fn session(&self, addr: &str) -> Result<(), MonitorError> {
        let mut connection = AmiConnection::connect(addr, self.server.connect_timeout).await?;
        connection
            .login(&self.server.username, &self.server.secret)
            .await?;

        info!(
            addr = %addr,
            banner = connection.banner(),
            "✅ Logged in to manager interface"
        );

        if let Err(e) = connection.send(AmiAction::pjsip_show_endpoints()).await {
            warn!(addr = %addr, error = %e, "Endpoint inventory request failed");
        }

        while let Some(message) = connection.next_message().await? {
            let Some(event_type) = message.event_type() else {
                continue;
            };
            debug!(event = event_type, "AMI event received");
            self.sink.handle_event(AmiEvent::from(&message)).await;
        }

        Ok(())
    }
}
