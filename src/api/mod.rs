// src/api/mod.rs
pub mod handlers;
pub mod routes;
pub mod ws;

pub use ws::WsSettings;
