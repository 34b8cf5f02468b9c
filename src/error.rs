// src/error.rs
use thiserror::Error;
use actix_web::{http::StatusCode, ResponseError, HttpResponse};
use serde_json::json;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connect to {0} timed out")]
    ConnectTimeout(String),

    #[error("AMI login failed: {0}")]
    LoginRejected(String),

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CDR import error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("WebSocket handshake rejected: {0}")]
    WebSocketHandshake(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for MonitorError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        HttpResponse::build(status_code).json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            MonitorError::WebSocketHandshake(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl MonitorError {
    fn error_code(&self) -> &str {
        match self {
            MonitorError::Io(_) => "io_error",
            MonitorError::ConnectTimeout(_) => "connect_timeout",
            MonitorError::LoginRejected(_) => "login_rejected",
            MonitorError::ConnectionClosed => "connection_closed",
            MonitorError::Config(_) => "config_error",
            MonitorError::Csv(_) => "cdr_import_error",
            MonitorError::Serialization(_) => "serialization_error",
            MonitorError::WebSocketHandshake(_) => "websocket_handshake",
            MonitorError::Internal(_) => "internal_error",
        }
    }
}
