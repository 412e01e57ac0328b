//! WeChat Relay web server.
//!
//! This binary:
//! - Answers the WeChat server verification challenge
//! - Receives message callbacks and verifies their signature
//! - Forwards text messages to the backend service
//! - Replies to WeChat immediately with a placeholder

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wxrelay::web::{is_token_configured, router};
use wxrelay::{AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    tracing_subscriber::registry()
        .with(log_filter())
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        token_configured = is_token_configured(&config.wechat_token),
        verify_post_signature = config.verify_post_signature,
        scf_api_url_configured = config.scf_api_url.is_some(),
        scf_api_key_configured = config.scf_api_key.is_some(),
        forward_timeout_ms = config.forward_timeout_ms,
        reply_mode = ?config.reply_mode,
        "config_loaded"
    );

    if !is_token_configured(&config.wechat_token) {
        warn!("WECHAT_TOKEN is not set; every signature check will fail");
    }
    if config.scf_api_url.is_none() {
        warn!("SCF_API_URL is not set; text messages will not be forwarded");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config).context("Failed to create HTTP client")?;
    let app = router(state);

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL`, otherwise `info`.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        env::var("LOG_LEVEL")
            .ok()
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .and_then(|level| EnvFilter::try_new(level).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    })
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
