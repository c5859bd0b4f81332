//! # rdep demo server
//!
//! Registers Redis from the `REDIS_*` environment, serves the demo routes and
//! closes the pool after a graceful shutdown.

use rdep_axum::{AppState, RedisRegistry};
use rdep_config::SettingsLoader;
use rdep_core::{init_logging, LogFormat, RedisDepError, RedisDepResult};
use rdep_server::create_router;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    init_logging(log_format());

    info!("Starting rdep demo server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

fn log_format() -> LogFormat {
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

async fn run() -> RedisDepResult<()> {
    let loader = SettingsLoader::from_default_location();
    let redis_settings = loader.redis()?;
    let server_settings = loader.server()?;

    let state = AppState::new();
    RedisRegistry::register(&state, Some(redis_settings)).await?;

    let router = create_router(state.clone());

    let addr = server_settings.bind_addr();
    info!("Starting REST server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RedisDepError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RedisDepError::Internal(format!("REST server error: {}", e)));

    RedisRegistry::terminate(&state);
    served?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
