use dualfetch_core::DeliveryError;
use thiserror::Error;

/// Failures inside the native host that never reach a request's callbacks.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("script is not a callback invocation: {0}")]
    MalformedScript(String),

    #[error("script argument is not JSON: {0}")]
    Argument(#[from] serde_json::Error),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}
