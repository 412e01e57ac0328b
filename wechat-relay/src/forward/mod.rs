//! Backend forwarding module.
//!
//! Text messages are handed to the backend ("SCF") service, which produces the
//! real answer and delivers it to the user out of band. The relay never waits
//! for that answer.
//!
//! ## Flow
//!
//! ```text
//! InboundMessage → ForwardPayload → Forwarder::forward() → POST <SCF_API_URL>
//! ```

pub mod client;
pub mod types;

pub use client::{ForwardError, ForwardOutcome, Forwarder};
pub use types::ForwardPayload;
