//! Script loader that fetches JSONP scripts and runs the callback they call.
//!
//! # Design
//! There is no JavaScript engine here. A script is accepted only in the
//! shape JSONP endpoints produce, `name(<json>);`, and "running" it means
//! invoking `name` in the `CallbackRegistry` with the parsed argument, which
//! is what a browser's global function would do.

use std::time::Duration;

use dualfetch_core::{CallbackRegistry, HttpMethod, HttpRequest, Payload, ScriptId, ScriptLoader, ScriptTag};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::execute;
use crate::error::HostError;
use crate::event_loop::{Delivery, EventLoop};

/// Upper bound on a single script download. The request's own timeout is
/// enforced by the core through the `Timer`.
pub const SCRIPT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Split `name(<json>);` into the callee and its parsed argument.
pub fn parse_jsonp(script: &str) -> Result<(String, Value), HostError> {
    let call = script.trim().trim_end_matches(';').trim_end();
    let open = call
        .find('(')
        .ok_or_else(|| HostError::MalformedScript("no call found".to_string()))?;
    if !call.ends_with(')') {
        return Err(HostError::MalformedScript("unterminated call".to_string()));
    }

    let name = call[..open].trim();
    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.');
    if !valid_name {
        return Err(HostError::MalformedScript(format!("invalid callee {name:?}")));
    }

    let argument = serde_json::from_str(&call[open + 1..call.len() - 1])?;
    Ok((name.to_string(), argument))
}

/// Evaluate a downloaded script against `registry`.
pub fn run_script(registry: &CallbackRegistry, script: &str) -> Result<(), HostError> {
    let (name, argument) = parse_jsonp(script)?;
    registry.invoke(&name, Payload::Json(argument))?;
    Ok(())
}

pub struct ScriptFetcher {
    event_loop: EventLoop,
    registry: CallbackRegistry,
}

impl ScriptFetcher {
    pub fn new(event_loop: EventLoop, registry: CallbackRegistry) -> Self {
        Self {
            event_loop,
            registry,
        }
    }
}

impl ScriptLoader for ScriptFetcher {
    fn attach(&self, tag: ScriptTag, on_load: Box<dyn FnOnce()>) -> ScriptId {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: tag.src.clone(),
            headers: Vec::new(),
            body: None,
            timeout: SCRIPT_FETCH_TIMEOUT,
        };
        let entry_point = tag.entry_point.clone();
        let registry = self.registry.clone();
        let then = move |delivery: Delivery| match delivery {
            Delivery::Response(response) if response.status == 200 => {
                if let Err(err) = run_script(&registry, &response.body) {
                    warn!(src = %tag.src, %err, "script did not deliver a payload");
                }
                on_load();
            }
            Delivery::Response(response) => {
                warn!(src = %tag.src, status = response.status, "script failed to load");
            }
            Delivery::TimedOut => warn!(src = %tag.src, "script download timed out"),
            Delivery::Failed(reason) => warn!(src = %tag.src, %reason, "script download failed"),
        };
        let id = self.event_loop.spawn(move || execute(&request), Box::new(then));
        debug!(job = id, %entry_point, "script attached");
        ScriptId(id)
    }

    fn detach(&self, id: ScriptId) {
        if self.event_loop.cancel_job(id.0) {
            debug!(job = id.0, "script detached before it ran");
        }
    }
}
