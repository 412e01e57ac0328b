//! Configuration module for environment variable parsing.
//!
//! Configuration is read once at startup and shared read-only with every
//! request handler.

use std::env;
use std::time::Duration;

use tracing::warn;
use url::Url;

/// Reply sent to the platform while the backend works on the real answer.
pub const DEFAULT_TEXT_PLACEHOLDER: &str = "我在思考啦，请稍等～";

/// Reply sent for image, voice, event and other non-text messages.
pub const DEFAULT_NON_TEXT_PLACEHOLDER: &str = "收到~（目前仅回显文本）";

/// How text messages are answered on the synchronous reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Reply with the configured placeholder and let the backend answer later.
    Placeholder,
    /// Echo the trimmed text back to the sender.
    Echo,
}

impl ReplyMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Some(ReplyMode::Placeholder),
            "echo" => Some(ReplyMode::Echo),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret configured in the WeChat admin console
    pub wechat_token: Option<String>,

    /// Whether POST callbacks must carry a valid signature
    pub verify_post_signature: bool,

    /// Backend endpoint receiving forwarded text messages
    pub scf_api_url: Option<String>,

    /// Value for the `X-API-Key` header on forwarded requests
    pub scf_api_key: Option<String>,

    /// Upper bound on a single backend call in milliseconds
    pub forward_timeout_ms: u64,

    /// Port for the web server to listen on
    pub port: u16,

    pub reply_mode: ReplyMode,

    pub text_placeholder: String,

    pub non_text_placeholder: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| non_blank(lookup(name));

        Config {
            wechat_token: get("WECHAT_TOKEN"),

            verify_post_signature: parse_or(
                "WECHAT_VERIFY_SIGNATURE",
                get("WECHAT_VERIFY_SIGNATURE"),
                parse_bool,
                true,
            ),

            scf_api_url: get("SCF_API_URL").and_then(|raw| validate_url(&raw)),

            scf_api_key: get("SCF_API_KEY"),

            forward_timeout_ms: parse_or(
                "FORWARD_TIMEOUT_MS",
                get("FORWARD_TIMEOUT_MS"),
                |v| v.trim().parse().ok(),
                5000,
            ),

            port: parse_or("PORT", get("PORT"), |v| v.trim().parse().ok(), 8080),

            reply_mode: parse_or(
                "WECHAT_REPLY_MODE",
                get("WECHAT_REPLY_MODE"),
                ReplyMode::parse,
                ReplyMode::Placeholder,
            ),

            text_placeholder: get("WECHAT_TEXT_PLACEHOLDER")
                .unwrap_or_else(|| DEFAULT_TEXT_PLACEHOLDER.to_string()),

            non_text_placeholder: get("WECHAT_NON_TEXT_PLACEHOLDER")
                .unwrap_or_else(|| DEFAULT_NON_TEXT_PLACEHOLDER.to_string()),
        }
    }

    /// Timeout applied to each backend forward.
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse an optional raw value, logging and falling back to `default` when invalid.
fn parse_or<T, P>(name: &str, raw: Option<String>, parse: P, default: T) -> T
where
    P: Fn(&str) -> Option<T>,
{
    let raw = match raw {
        Some(v) => v,
        None => return default,
    };

    match parse(&raw) {
        Some(value) => value,
        None => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Accept only absolute http(s) URLs for the backend.
fn validate_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(trimmed.to_string()),
        Ok(url) => {
            warn!(env_var = "SCF_API_URL", scheme = url.scheme(), "Unsupported URL scheme, forwarding disabled");
            None
        }
        Err(e) => {
            warn!(env_var = "SCF_API_URL", error = %e, "Invalid URL, forwarding disabled");
            None
        }
    }
}
