// src/api/routes.rs
use actix_web::web;
use crate::api::{handlers, ws};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .service(
                web::scope("/calls")
                    .route("/active", web::get().to(handlers::active_calls))
                    .route("/history", web::get().to(handlers::call_history))
                    .route("/presence", web::get().to(handlers::presence))
                    .route("/snapshot", web::get().to(handlers::snapshot))
                    .route("/stats", web::get().to(handlers::stats))
                    // push feed; clients fall back to polling the routes above
                    .route("/ws", web::get().to(ws::calls_ws)),
            ),
    );
}
