//! Host platform primitives the transports call through.
//!
//! # Design
//! The core is single-threaded and event-driven. Hosts implement these
//! traits on top of whatever they have (a browser, a native event loop, a
//! test fake) and are expected to run every callback on the same thread, from
//! their own loop rather than re-entrantly from inside a trait method.

use std::rc::Rc;
use std::time::Duration;

use crate::http::HttpClient;
use crate::registry::{CallbackRegistry, CallbackToken};

/// A script element to inject for a cross-origin request.
///
/// When the remote script runs it calls `entry_point` with its payload; the
/// host routes that call to `CallbackRegistry::invoke` (by name) or
/// `CallbackRegistry::resolve` (by `token`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: String,
    pub entry_point: String,
    pub token: CallbackToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptId(pub u64);

/// One-shot remote script loader.
pub trait ScriptLoader {
    /// Attach the script to the document root and start loading it.
    /// `on_load` fires after the script has run.
    fn attach(&self, tag: ScriptTag, on_load: Box<dyn FnOnce()>) -> ScriptId;

    /// Remove the script and drop its load listener. Unknown ids are ignored.
    fn detach(&self, id: ScriptId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Delayed execution with cancel support.
pub trait Timer {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId;

    /// Cancel a scheduled task. Ignored if it already ran.
    fn cancel(&self, id: TimerId);
}

/// Everything a dispatch needs from the host, cheap to clone.
#[derive(Clone)]
pub struct Environment {
    pub http: Rc<dyn HttpClient>,
    pub scripts: Rc<dyn ScriptLoader>,
    pub timer: Rc<dyn Timer>,
    pub registry: CallbackRegistry,
}

impl Environment {
    pub fn new(
        http: Rc<dyn HttpClient>,
        scripts: Rc<dyn ScriptLoader>,
        timer: Rc<dyn Timer>,
    ) -> Self {
        Self::with_registry(http, scripts, timer, CallbackRegistry::default())
    }

    /// Build an environment around an existing registry, for hosts whose
    /// script loader needs to deliver payloads into it.
    pub fn with_registry(
        http: Rc<dyn HttpClient>,
        scripts: Rc<dyn ScriptLoader>,
        timer: Rc<dyn Timer>,
        registry: CallbackRegistry,
    ) -> Self {
        Self {
            http,
            scripts,
            timer,
            registry,
        }
    }
}
