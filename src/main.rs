// src/main.rs
use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use anyhow::Context;
use pbx_call_monitor::ami::AmiClient;
use pbx_call_monitor::api::{self, WsSettings};
use pbx_call_monitor::services::CallTracker;
use pbx_call_monitor::shutdown::{cancel_on_signal, shutdown_signal};
use pbx_call_monitor::Config;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("🚀 Starting PBX call monitor");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Environment: {}", config.environment);

    let tracker = Arc::new(CallTracker::new(config.history));
    info!(
        max_history = config.history.max_entries(),
        retention_hours = config.history.retention().num_hours(),
        "✅ Call tracker ready"
    );

    if let Some(path) = &config.cdr_csv_path {
        match tracker.import_cdr(path).await {
            Ok(count) => info!(path = %path.display(), imported = count, "✅ CDR history imported"),
            Err(e) => warn!(path = %path.display(), error = %e, "CDR import failed, starting with empty history"),
        }
    }

    let shutdown = CancellationToken::new();

    let ami_task = match config.ami_server.clone() {
        Some(server) => {
            let client = AmiClient::new(server, tracker.clone());
            let cancel = shutdown.clone();
            info!("✅ Manager interface client started");
            Some(tokio::spawn(async move {
                if let Err(e) = client.run(cancel).await {
                    error!("Manager interface client error: {}", e);
                }
            }))
        }
        None => {
            info!("⚠️  No manager interface configured, live feed disabled");
            None
        }
    };

    let bind_address = format!("{}:{}", config.host, config.port);
    info!("🌐 Starting HTTP server on {}", bind_address);

    let ws_settings = WsSettings {
        ping_interval: config.ws_ping_interval,
    };
    let server_shutdown = shutdown.clone();
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(web::Data::new(tracker.clone()))
            .app_data(web::Data::new(ws_settings.clone()))
            .app_data(web::Data::new(server_shutdown.clone()))
            .configure(api::routes::configure)
    })
    .workers(config.http_workers)
    .disable_signals()
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    // sessions are cancelled before the graceful stop begins
    let handle = server.handle();
    actix_rt::spawn(cancel_on_signal(
        shutdown_signal(),
        shutdown.clone(),
        async move { handle.stop(true).await },
    ));

    let result = server.await;

    info!("🛑 HTTP server stopped, shutting down");
    shutdown.cancel();
    if let Some(task) = ami_task {
        if let Err(e) = task.await {
            error!("Manager interface task ended abnormally: {}", e);
        }
    }

    result.context("HTTP server error")
}
