//! Cross-origin transport: script injection plus a registered entry point.
//!
//! # Design
//! One call owns three host resources: a registry entry, an injected script
//! and a timer. Whichever of "payload arrived" and "timer fired" happens first
//! releases all three and settles the call; the loser finds its resources
//! already gone and the `Settlement` already taken.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::config::Request;
use crate::env::{Environment, ScriptId, ScriptTag, TimerId};
use crate::error::ConfigError;
use crate::outcome::Failure;
use crate::shape::{self, Payload};

#[derive(Default)]
struct Pending {
    script: Cell<Option<ScriptId>>,
    timer: Cell<Option<TimerId>>,
}

pub(crate) fn send(env: &Environment, request: Request, entry_point: String) -> Result<(), ConfigError> {
    let Request {
        url,
        timeout,
        shape: options,
        settlement,
        ..
    } = request;
    let pending = Rc::new(Pending::default());

    let on_payload = {
        let env = env.clone();
        let pending = pending.clone();
        let settlement = settlement.clone();
        move |payload: Payload| {
            if let Some(script) = pending.script.take() {
                env.scripts.detach(script);
            }
            if let Some(timer) = pending.timer.take() {
                env.timer.cancel(timer);
            }
            let raw = payload.clone();
            let result = shape::shape(&options, payload).map_err(|err| Failure::shaping(&err, Some(raw)));
            settlement.settle(result);
        }
    };
    let token = env.registry.register(&entry_point, Box::new(on_payload))?;

    let on_load = {
        let entry_point = entry_point.clone();
        move || debug!(entry_point = %entry_point, "script loaded")
    };
    let script = env.scripts.attach(
        ScriptTag {
            src: url,
            entry_point,
            token,
        },
        Box::new(on_load),
    );
    if settlement.is_settled() {
        // The loader ran the script synchronously.
        env.scripts.detach(script);
        return Ok(());
    }
    pending.script.set(Some(script));

    let on_timeout = {
        let env = env.clone();
        let pending = pending.clone();
        move || {
            pending.timer.set(None);
            env.registry.remove(token);
            if let Some(script) = pending.script.take() {
                env.scripts.detach(script);
            }
            debug!(%token, "cross-origin request timed out");
            settlement.reject(Failure::timeout());
        }
    };
    let timer = env.timer.schedule(timeout, Box::new(on_timeout));
    pending.timer.set(Some(timer));
    debug!(%token, ?timeout, "script injected");
    Ok(())
}
