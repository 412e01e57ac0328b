//! Envelope module for the XML documents exchanged with WeChat.
//!
//! This module provides:
//! - `InboundMessage`: the decoded field list of a callback body
//! - `OutboundReply`: the passive text reply sent back in the HTTP response
//! - `decode` / `encode` for moving between bytes and those types
//!
//! ## Flow
//!
//! ```text
//! POST body → decode() → InboundMessage → handler → OutboundReply → encode() → response body
//! ```

pub mod codec;
pub mod types;

pub use codec::{decode, encode, DecodeError};
pub use types::{InboundMessage, OutboundReply, MSG_TYPE_TEXT};
