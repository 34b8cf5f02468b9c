// src/ami/connection.rs
use crate::ami::codec::{AmiAction, AmiCodec, AmiMessage};
use crate::error::MonitorError;
use futures::{SinkExt, StreamExt};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info};

/// Upper bound for the greeting line.
const MAX_BANNER_LENGTH: usize = 1024;

/// One manager-interface session over a framed stream.
pub struct AmiConnection<S = TcpStream> {
    framed: Framed<S, AmiCodec>,
    banner: String,
}

impl AmiConnection<TcpStream> {
    /// Dials `addr` and reads the banner, both within `connect_timeout`.
    pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<Self, MonitorError> {
        debug!(addr = %addr, "Dialing manager interface");

        let dial = async {
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            info!(addr = %addr, "TCP connection established");
            Self::open(stream).await
        };
        timeout(connect_timeout, dial)
            .await
            .map_err(|_| MonitorError::ConnectTimeout(addr.to_string()))?
    }
}

impl<S> AmiConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the banner line from a fresh stream, then starts framing.
    ///
    /// The banner is read one byte at a time so nothing past its line
    /// terminator is consumed before the codec takes over.
    pub async fn open(mut stream: S) -> Result<Self, MonitorError> {
        let mut line = Vec::with_capacity(64);
        loop {
            let byte = match stream.read_u8().await {
                Ok(byte) => byte,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(MonitorError::ConnectionClosed)
                }
                Err(e) => return Err(e.into()),
            };
            if byte == b'\n' {
                break;
            }
            if line.len() >= MAX_BANNER_LENGTH {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "manager interface banner too long",
                )
                .into());
            }
            line.push(byte);
        }

        let banner = String::from_utf8_lossy(&line).trim().to_string();
        debug!(banner = %banner, "Banner received");
        Ok(Self {
            framed: Framed::new(stream, AmiCodec::new()),
            banner,
        })
    }

    pub fn banner(&self) -> &str {
        &self.banner
    }

    pub async fn send(&mut self, action: AmiAction) -> Result<(), MonitorError> {
        debug!(action = action.name(), "Sending action");
        self.framed.send(action).await?;
        Ok(())
    }

    /// Next complete block, or `None` once the remote has closed.
    pub async fn next_message(&mut self) -> Result<Option<AmiMessage>, MonitorError> {
        Ok(self.framed.next().await.transpose()?)
    }

    /// Sends the login action and waits for its response block. The banner
    /// has already been read by [`AmiConnection::open`].
    ///
    /// Anything other than `Response: Success` is a rejection. Event blocks
    /// arriving before the response are skipped.
    pub async fn login(&mut self, username: &str, secret: &str) -> Result<(), MonitorError> {
        self.send(AmiAction::login(username, secret)).await?;

        loop {
            let message = self
                .next_message()
                .await?
                .ok_or(MonitorError::ConnectionClosed)?;
            let Some(response) = message.response() else {
                continue;
            };

            if response.eq_ignore_ascii_case("success") {
                return Ok(());
            }
            let reason = message
                .get("Message")
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(response);
            return Err(MonitorError::LoginRejected(reason.to_string()));
        }
    }
}
