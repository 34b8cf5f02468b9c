// src/lib.rs
//! Live call, history and presence tracking fed by a PBX manager interface.

pub mod ami;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod shutdown;
pub mod websocket;

pub use config::Config;
pub use error::MonitorError;
