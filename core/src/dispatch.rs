//! Public entry point: validate, pick a transport, wire up the callbacks.

use tracing::debug;

use crate::config::{validate, Mode, RequestConfig};
use crate::cross_origin;
use crate::env::Environment;
use crate::error::ConfigError;
use crate::registry::CallbackRegistry;
use crate::same_origin;

/// Dispatches requests against one host environment.
#[derive(Clone)]
pub struct Dispatcher {
    env: Environment,
}

impl Dispatcher {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// The registry the host routes callback entry points into.
    pub fn registry(&self) -> &CallbackRegistry {
        &self.env.registry
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Start one request.
    ///
    /// Configuration problems are returned here and nothing is sent. Every
    /// other outcome arrives later, exactly once, through `on_success` or
    /// `on_failure`.
    pub fn dispatch(&self, config: RequestConfig) -> Result<(), ConfigError> {
        dispatch(&self.env, config)
    }
}

/// Start one request against `env`. See [`Dispatcher::dispatch`].
pub fn dispatch(env: &Environment, config: RequestConfig) -> Result<(), ConfigError> {
    let request = validate(config)?;
    debug!(url = %request.url, mode = ?request.mode, format = %request.shape.format, "dispatching");
    match request.mode.clone() {
        Mode::Callback { entry_point } => cross_origin::send(env, request, entry_point),
        Mode::Ajax => {
            same_origin::send(env, request);
            Ok(())
        }
    }
}
