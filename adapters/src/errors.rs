//! Custom error types specific to the `adapters` crate.
//!
//! These cover provider HTTP failures, malformed provider payloads, and
//! webhook signature verification failures, giving the backend a single
//! error surface for all outbound integrations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("unexpected provider response: {0}")]
    Decode(String),

    #[error("invalid webhook signature: {0}")]
    Signature(String),
}
