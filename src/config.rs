// src/config.rs
use crate::error::MonitorError;
use crate::services::HistoryLimits;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
const DEFAULT_WS_PING_INTERVAL_SECS: u64 = 25;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub http_workers: usize,
    pub ami_server: Option<AmiServer>,
    pub history: HistoryLimits,
    pub cdr_csv_path: Option<PathBuf>,
    pub ws_ping_interval: Duration,
}

#[derive(Clone)]
pub struct AmiServer {
    pub addr: String,
    pub username: String,
    pub secret: String,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl fmt::Debug for AmiServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmiServer")
            .field("addr", &self.addr)
            .field("username", &self.username)
            .field("secret", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, MonitorError> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let ami_server = match get("AMI_ADDR") {
            Some(addr) => {
                let username = get("AMI_USERNAME").ok_or_else(|| {
                    MonitorError::Config("AMI_USERNAME is required when AMI_ADDR is set".to_string())
                })?;
                let secret = get("AMI_SECRET").ok_or_else(|| {
                    MonitorError::Config("AMI_SECRET is required when AMI_ADDR is set".to_string())
                })?;
                Some(AmiServer {
                    addr,
                    username,
                    secret,
                    connect_timeout: Duration::from_secs(
                        parse_or(get("AMI_CONNECT_TIMEOUT_SECS"), "AMI_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?.max(1),
                    ),
                    reconnect_delay: Duration::from_secs(
                        parse_or(get("AMI_RECONNECT_DELAY_SECS"), "AMI_RECONNECT_DELAY_SECS", DEFAULT_RECONNECT_DELAY_SECS)?.max(1),
                    ),
                })
            }
            None => None,
        };

        let max_history: i64 = parse_or(get("CALL_HISTORY_MAX"), "CALL_HISTORY_MAX", 0)?;
        let retention_hours: i64 =
            parse_or(get("CALL_HISTORY_RETENTION_HOURS"), "CALL_HISTORY_RETENTION_HOURS", 0)?;

        Ok(Config {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "production".to_string()),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 8080)?,
            http_workers: parse_or(get("HTTP_WORKERS"), "HTTP_WORKERS", 4usize)?.max(1),
            ami_server,
            history: HistoryLimits::new(max_history, retention_hours),
            cdr_csv_path: get("CDR_CSV_PATH").map(PathBuf::from),
            ws_ping_interval: Duration::from_secs(
                parse_or(get("WS_PING_INTERVAL_SECS"), "WS_PING_INTERVAL_SECS", DEFAULT_WS_PING_INTERVAL_SECS)?.max(1),
            ),
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, MonitorError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| MonitorError::Config(format!("{} has an invalid value: {}", key, value))),
        None => Ok(default),
    }
}
