// tests/ami_simulator.rs
//! Manager-interface simulator for integration testing
//!
//! Builds realistic event blocks and serves them from a fake PBX socket so
//! the call monitor can be exercised without a real PBX.
#![allow(dead_code)]

use pbx_call_monitor::ami::AmiEvent;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

pub const BANNER: &str = "Asterisk Call Manager/5.0.1\r\n";

/// Event block builder
#[derive(Debug, Clone, Default)]
pub struct AmiEventBuilder {
    fields: Vec<(String, String)>,
}

impl AmiEventBuilder {
    pub fn new(event: &str) -> Self {
        Self::default().header("Event", event)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn linked_id(self, id: &str) -> Self {
        self.header("Linkedid", id)
    }

    pub fn unique_id(self, id: &str) -> Self {
        self.header("Uniqueid", id)
    }

    pub fn channel(self, channel: &str) -> Self {
        self.header("Channel", channel)
    }

    pub fn caller(self, number: &str) -> Self {
        self.header("CallerIDNum", number)
    }

    pub fn exten(self, exten: &str) -> Self {
        self.header("Exten", exten)
    }

    pub fn cause_text(self, cause: &str) -> Self {
        self.header("Cause-txt", cause)
    }

    /// Wire form, blank-line terminated
    pub fn build(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\r\n", key, value));
        }
        out.push_str("\r\n");
        out
    }

    pub fn to_event(&self) -> AmiEvent {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

/// Two-legged call between internal extensions
#[derive(Debug, Clone)]
pub struct SimulatedCall {
    pub linked_id: String,
    pub caller: String,
    pub callee: String,
    caller_leg: String,
    callee_leg: String,
}

impl SimulatedCall {
    pub fn new(linked_id: &str, caller: &str, callee: &str) -> Self {
        Self {
            linked_id: linked_id.to_string(),
            caller: caller.to_string(),
            callee: callee.to_string(),
            caller_leg: format!("{}.1", linked_id),
            callee_leg: format!("{}.2", linked_id),
        }
    }

    pub fn caller_channel_created(&self) -> AmiEventBuilder {
        AmiEventBuilder::new("Newchannel")
            .linked_id(&self.linked_id)
            .unique_id(&self.caller_leg)
            .channel(&format!("PJSIP/{}-00000001", self.caller))
            .caller(&self.caller)
            .exten(&self.callee)
            .header("ChannelStateDesc", "Ring")
    }

    pub fn dial_begin(&self) -> AmiEventBuilder {
        AmiEventBuilder::new("DialBegin")
            .linked_id(&self.linked_id)
            .header("SrcUniqueid", &self.caller_leg)
            .header("DestUniqueid", &self.callee_leg)
            .header("DialString", &format!("PJSIP/{},30", self.callee))
    }

    pub fn bridged(&self) -> Vec<AmiEventBuilder> {
        [&self.caller_leg, &self.callee_leg]
            .into_iter()
            .map(|leg| {
                AmiEventBuilder::new("BridgeEnter")
                    .linked_id(&self.linked_id)
                    .unique_id(leg)
            })
            .collect()
    }

    pub fn hung_up(&self, cause: &str) -> Vec<AmiEventBuilder> {
        [&self.callee_leg, &self.caller_leg]
            .into_iter()
            .map(|leg| {
                AmiEventBuilder::new("Hangup")
                    .linked_id(&self.linked_id)
                    .unique_id(leg)
                    .cause_text(cause)
            })
            .collect()
    }

    /// Full answered call, in wire order
    pub fn answered_flow(&self) -> Vec<AmiEventBuilder> {
        let mut flow = vec![self.caller_channel_created(), self.dial_begin()];
        flow.extend(self.bridged());
        flow.extend(self.hung_up("Normal Clearing"));
        flow
    }
}

/// What the fake PBX does with one accepted connection
#[derive(Debug, Clone)]
pub enum SessionScript {
    RejectLogin,
    Accept(Vec<String>),
}

/// Fake manager-interface server; serves one script per connection, in order
pub struct FakeAmiServer {
    pub addr: String,
    logins: Arc<AtomicUsize>,
}

impl FakeAmiServer {
    pub async fn start(scripts: Vec<SessionScript>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let logins = Arc::new(AtomicUsize::new(0));
        let counter = logins.clone();

        tokio::spawn(async move {
            for script in scripts {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                let (read_half, mut write_half) = socket.into_split();
                let mut reader = BufReader::new(read_half);

                if write_half.write_all(BANNER.as_bytes()).await.is_err() {
                    continue;
                }
                read_block(&mut reader).await;
                counter.fetch_add(1, Ordering::SeqCst);

                match script {
                    SessionScript::RejectLogin => {
                        let _ = write_half
                            .write_all(b"Response: Error\r\nMessage: Authentication failed\r\n\r\n")
                            .await;
                    }
                    SessionScript::Accept(events) => {
                        let _ = write_half
                            .write_all(b"Response: Success\r\nMessage: Authentication accepted\r\n\r\n")
                            .await;
                        read_block(&mut reader).await;
                        for event in events {
                            let _ = write_half.write_all(event.as_bytes()).await;
                        }
                        wait_for_close(&mut reader).await;
                    }
                }
            }
        });

        Self { addr, logins }
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

/// Reads one blank-line-terminated block
pub async fn read_block<R: AsyncBufRead + Unpin>(reader: &mut R) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return lines,
            Ok(_) => {}
        }
        let line = line.trim_end();
        if line.is_empty() {
            return lines;
        }
        lines.push(line.to_string());
    }
}

async fn wait_for_close<R: AsyncBufRead + Unpin>(reader: &mut R) {
    let mut line = String::new();
    while let Ok(n) = reader.read_line(&mut line).await {
        if n == 0 {
            break;
        }
        line.clear();
    }
}
