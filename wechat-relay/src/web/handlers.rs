//! WeChat callback endpoint handlers.
//!
//! The message path always answers 200 once the signature checks out:
//! WeChat retries any callback that errors or times out, so decode and
//! backend failures are logged and swallowed here.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};
use url::form_urlencoded;

use crate::config::ReplyMode;
use crate::envelope::{decode, InboundMessage, OutboundReply};
use crate::forward::{ForwardError, ForwardPayload, Forwarder};
use crate::util::clock::unix_now;
use crate::web::signature::verify_wechat_signature;
use crate::Config;

/// Body returned with every 403.
pub const INVALID_SIGNATURE_BODY: &str = "invalid signature";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(config: Config) -> reqwest::Result<Self> {
        let forwarder = Forwarder::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            forwarder,
        })
    }

    fn signature_valid(&self, query: &SignatureQuery) -> bool {
        verify_wechat_signature(
            self.config.wechat_token.as_deref().unwrap_or(""),
            &query.signature,
            &query.timestamp,
            &query.nonce,
        )
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ts: u64,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        ts: unix_now(),
    })
}

// =============================================================================
// WeChat Callback
// =============================================================================

/// Query parameters WeChat appends to every callback URL.
///
/// Missing parameters are empty strings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SignatureQuery {
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
    /// Only sent on the GET challenge
    pub echostr: String,
}

impl SignatureQuery {
    /// Parse a raw query string leniently.
    ///
    /// Never fails: a repeated key keeps its first value and unknown keys are
    /// ignored, so a sloppy URL ends in a signature check instead of a 400.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let mut query = SignatureQuery::default();
        let mut seen = [false; 4];

        for (key, value) in form_urlencoded::parse(raw.unwrap_or("").as_bytes()) {
            let (slot, field) = match key.as_ref() {
                "signature" => (0, &mut query.signature),
                "timestamp" => (1, &mut query.timestamp),
                "nonce" => (2, &mut query.nonce),
                "echostr" => (3, &mut query.echostr),
                _ => continue,
            };
            if !seen[slot] {
                seen[slot] = true;
                *field = value.into_owned();
            }
        }

        query
    }
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, INVALID_SIGNATURE_BODY).into_response()
}

/// Server verification challenge.
///
/// Echoes `echostr` verbatim when the signature matches, proving possession
/// of the token without touching any message content.
pub async fn wechat_challenge(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = SignatureQuery::from_raw(raw.as_deref());

    if !state.signature_valid(&query) {
        warn!(
            token_configured = state.config.wechat_token.is_some(),
            "wechat_challenge_signature_invalid"
        );
        return forbidden();
    }

    info!(echostr_length = query.echostr.len(), "wechat_challenge_accepted");

    (StatusCode::OK, query.echostr).into_response()
}

/// Inbound message callback.
///
/// This endpoint:
/// 1. Verifies the signature (unless disabled by configuration)
/// 2. Decodes the XML envelope, answering an empty 200 if that fails
/// 3. Forwards text messages to the backend
/// 4. Returns a passive text reply
pub async fn wechat_message(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    body: Bytes,
) -> Response {
    info!(body_length = body.len(), "wechat_message_received");

    let query = SignatureQuery::from_raw(raw.as_deref());

    if state.config.verify_post_signature && !state.signature_valid(&query) {
        warn!(
            token_configured = state.config.wechat_token.is_some(),
            "wechat_message_signature_invalid"
        );
        return forbidden();
    }

    let message = match decode(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, body_length = body.len(), "wechat_xml_decode_failed");
            return StatusCode::OK.into_response();
        }
    };

    let reply = relay_message(&state, &message).await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        reply.to_xml(),
    )
        .into_response()
}

/// Forward a decoded message if it is text and build the immediate reply.
///
/// The reply never depends on the backend outcome.
pub async fn relay_message(state: &AppState, message: &InboundMessage) -> OutboundReply {
    let msg_type = message.msg_type();

    info!(
        msg_type = %msg_type,
        from_user = %message.from_user_name(),
        has_msg_id = message.msg_id().is_some(),
        "wechat_message_decoded"
    );

    if !message.is_text() {
        info!(msg_type = %msg_type, "wechat_non_text_message");
        return OutboundReply::reply_to(message, state.config.non_text_placeholder.as_str());
    }

    let payload = ForwardPayload::from_text_message(message);
    forward_text(&state.forwarder, &payload).await;

    let content = match state.config.reply_mode {
        ReplyMode::Placeholder => state.config.text_placeholder.clone(),
        ReplyMode::Echo => payload.text,
    };

    OutboundReply::reply_to(message, content)
}

/// Forward once and log the outcome; failures never reach the caller.
async fn forward_text(forwarder: &Forwarder, payload: &ForwardPayload) {
    match forwarder.forward(payload).await {
        Ok(outcome) => {
            info!(openid = %payload.openid, status_code = outcome.status, "scf_forwarded");
        }
        Err(ForwardError::NotConfigured) => {
            warn!(openid = %payload.openid, "scf_api_url_not_configured");
        }
        Err(ForwardError::Status { status, body_preview }) => {
            warn!(
                openid = %payload.openid,
                status_code = status,
                body_preview = %body_preview,
                "scf_forward_non_success"
            );
        }
        Err(ForwardError::Timeout(timeout)) => {
            error!(
                openid = %payload.openid,
                timeout_ms = timeout.as_millis() as u64,
                "scf_forward_timeout"
            );
        }
        Err(e @ ForwardError::Request(_)) => {
            error!(openid = %payload.openid, error = %e, "scf_forward_request_error");
        }
        Err(e @ ForwardError::Serialize(_)) => {
            error!(openid = %payload.openid, error = %e, "scf_forward_serialize_failed");
        }
    }
}
