//! # claimsrv-api — Binary Entry Point
//!
//! Loads configuration, bootstraps the registry, and serves the service and
//! admin APIs until Ctrl-C or `POST /api/unstable/stop`.

use anyhow::Context;
use claimsrv_api::config::AppConfig;
use claimsrv_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::debug!(?config, "configuration loaded");
    let service_addr = config.service_addr;
    let admin_addr = config.admin_addr;

    let state = claimsrv_api::bootstrap::bootstrap(config).map_err(|e| {
        tracing::error!("bootstrap failed: {e}");
        e
    })?;

    let service_listener = tokio::net::TcpListener::bind(service_addr)
        .await
        .with_context(|| format!("binding service API on {service_addr}"))?;
    let admin_listener = tokio::net::TcpListener::bind(admin_addr)
        .await
        .with_context(|| format!("binding admin API on {admin_addr}"))?;
    tracing::info!(%service_addr, %admin_addr, "claimsrv listening");

    let service = axum::serve(service_listener, claimsrv_api::app(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state.clone()));
    let admin = axum::serve(admin_listener, claimsrv_api::admin_app(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state.clone()));

    tokio::try_join!(
        async { service.await.context("service API") },
        async { admin.await.context("admin API") },
    )?;

    tracing::info!(version = state.registry.version(), "claimsrv stopped");
    Ok(())
}

/// `RUST_LOG` filter (default `info`); JSON output when
/// `CLAIMSRV_LOG_FORMAT=json`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("CLAIMSRV_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Resolves on Ctrl-C or an admin stop request, and signals the other
/// listener in either case.
async fn shutdown_signal(state: AppState) {
    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => {
                tracing::info!("Ctrl-C received, shutting down");
                state.request_shutdown();
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl-C: {e}");
                state.shutdown_requested().await;
            }
        },
        _ = state.shutdown_requested() => {}
    }
}
