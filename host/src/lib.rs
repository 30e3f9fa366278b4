//! Native host for `dualfetch-core`.
//!
//! # Overview
//! Supplies the platform primitives the core expects, outside a browser:
//! an [`EventLoop`] acting as the timer, a ureq-backed [`UreqClient`] for
//! ajax mode and a [`ScriptFetcher`] that downloads JSONP scripts and runs
//! the callback they name.
//!
//! # Design
//! - Everything the core sees runs on the thread that calls
//!   [`NativeHost::run`]; only blocking downloads run on worker threads.
//! - Transport failures with no response (connection refused) are reported
//!   to the core as status 0, like a browser would.

pub mod client;
pub mod error;
pub mod event_loop;
pub mod scripts;

use std::rc::Rc;

use dualfetch_core::{CallbackRegistry, ConfigError, Dispatcher, Environment, RequestConfig};

pub use client::UreqClient;
pub use error::HostError;
pub use event_loop::{Delivery, EventLoop};
pub use scripts::ScriptFetcher;

/// A dispatcher wired to native transports.
pub struct NativeHost {
    event_loop: EventLoop,
    dispatcher: Dispatcher,
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHost {
    pub fn new() -> Self {
        let event_loop = EventLoop::new();
        let registry = CallbackRegistry::default();
        let env = Environment::with_registry(
            Rc::new(UreqClient::new(event_loop.clone())),
            Rc::new(ScriptFetcher::new(event_loop.clone(), registry.clone())),
            Rc::new(event_loop.clone()),
            registry,
        );
        Self {
            event_loop,
            dispatcher: Dispatcher::new(env),
        }
    }

    /// Queue a request. Nothing happens until [`NativeHost::run`].
    pub fn dispatch(&self, config: RequestConfig) -> Result<(), ConfigError> {
        self.dispatcher.dispatch(config)
    }

    /// Drive every queued request to completion.
    pub fn run(&self) {
        self.event_loop.run();
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }
}
