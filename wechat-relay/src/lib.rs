//! WeChat Relay - stateless webhook relay for WeChat Official Accounts.
//!
//! Receives platform callbacks, verifies their signature, decodes the XML
//! envelope, forwards text messages to a backend ("SCF") service and answers
//! with a passive text reply.
//!
//! ## Architecture
//!
//! ```text
//! WeChat → /wechat → signature → envelope::decode → forward → envelope reply → WeChat
//!                                                      ↓
//!                                               backend service
//! ```

pub mod config;
pub mod envelope;
pub mod forward;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ReplyMode};
pub use envelope::{decode, encode, DecodeError, InboundMessage, OutboundReply};
pub use forward::{ForwardError, ForwardOutcome, ForwardPayload, Forwarder};
pub use web::{router, AppState};
