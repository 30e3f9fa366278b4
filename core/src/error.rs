//! Error types for request dispatch and response shaping.
//!
//! # Design
//! Errors are split by where they surface. `ConfigError` is returned
//! synchronously from `dispatch` before any transport is touched.
//! `FormatError` is produced while shaping a response and never escapes:
//! the transports turn it into a `Failure` for the caller's `on_failure`.
//! `DeliveryError` is returned to the host when it calls an entry point
//! that has nothing pending.

use thiserror::Error;

use crate::registry::CallbackToken;

/// Problems with a `RequestConfig`, raised before any I/O starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Every required field that was absent or empty, in check order.
    #[error("missing required parameters: [{}]", .0.join(","))]
    MissingParameters(Vec<&'static str>),

    #[error("invalid value for 'mode': \"{0}\"")]
    InvalidMode(String),

    #[error("'mode: callback' was specified but no callback function was given.")]
    MissingCallback,

    /// Another cross-origin request is still waiting on this entry point.
    #[error("callback '{0}' already has a pending request")]
    CallbackInUse(String),
}

/// Problems turning a raw payload into the requested shape.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid value of 'format': \"{0}\"")]
    UnknownFormat(String),

    #[error("payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The replacer returned `Omit` for the root value.
    #[error("replacer left nothing to serialize")]
    NothingToSerialize,
}

/// Returned to the host when a callback entry point fires with no pending
/// request behind it (usually a response that arrived after its timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("no pending request for callback '{0}'")]
    NoPendingCall(String),

    #[error("no pending request for token {0}")]
    UnknownToken(CallbackToken),
}
