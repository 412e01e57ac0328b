//! Web server module for WeChat callbacks.
//!
//! This module provides the HTTP surface of the relay:
//! - `GET /healthz` for liveness probes
//! - `GET /wechat` for the server verification challenge
//! - `POST /wechat` for inbound messages
//!
//! Every request is handled independently; the only shared state is the
//! immutable configuration and the backend HTTP client.

pub mod handlers;
pub mod signature;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, relay_message, wechat_challenge, wechat_message, AppState, HealthResponse,
    SignatureQuery, INVALID_SIGNATURE_BODY,
};
pub use signature::{compute_signature, is_token_configured, verify_wechat_signature};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/wechat", get(wechat_challenge).post(wechat_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
