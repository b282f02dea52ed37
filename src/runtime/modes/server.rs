//! Server mode
//!
//! Opens the database, starts the reload supervisor and serves HTTP until
//! Ctrl+C.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, NormalizePath, TrailingSlash},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::middleware::RequestLog;
use crate::api::{configure, validate_cors_config};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// 1. Prepares the startup context (initial database, limiter, watcher)
/// 2. Binds and runs the actix server
/// 3. On Ctrl+C stops background tasks
pub async fn run_server(config: Arc<StaticConfig>) -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup(config.clone()).await?;
    validate_cors_config(&config.cors);

    let state = startup.app_state();
    let server_config = config.server.clone();
    let cpu_count = server_config.cpu_count.max(1);
    info!("Using {} worker threads", cpu_count);

    let bind_address = server_config.bind_address();
    let server = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Compress::default())
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .wrap(RequestLog)
            .configure(|cfg| configure(cfg, &state))
    })
    .keep_alive(Duration::from_secs(server_config.keep_alive_secs))
    .client_request_timeout(Duration::from_millis(server_config.client_request_timeout_ms))
    .workers(cpu_count)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?;

    warn!("Starting server at http://{}", bind_address);
    let server = server.run();
    let server_handle = server.handle();

    tokio::select! {
        res = server => {
            res.context("HTTP server error")?;
        }
        _ = lifetime::shutdown::listen_for_shutdown() => {
            server_handle.stop(true).await;
        }
    }

    startup.shutdown().await;
    warn!("Graceful shutdown completed");
    Ok(())
}
