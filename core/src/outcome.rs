//! Terminal results of a dispatch and the at-most-once guard around them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use crate::error::FormatError;
use crate::shape::{Payload, ResponseData};

pub const TIMED_OUT: &str = "request timed out";
pub const NOT_SUCCESSFUL: &str = "request did not succeed";

/// Delivered to `on_success`.
#[derive(Debug, Clone, PartialEq)]
pub struct Success {
    pub data: ResponseData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureReason {
    Timeout,
    Error,
}

/// Delivered to `on_failure`.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub reason: FailureReason,
    /// The raw payload, when one arrived and is worth handing back.
    pub data: Option<Payload>,
    pub msg: String,
    /// HTTP status, set only for same-origin responses other than 200.
    pub status: Option<u16>,
}

impl Failure {
    pub fn timeout() -> Self {
        Self {
            reason: FailureReason::Timeout,
            data: None,
            msg: TIMED_OUT.to_string(),
            status: None,
        }
    }

    pub fn unsuccessful(status: u16) -> Self {
        Self {
            reason: FailureReason::Error,
            data: None,
            msg: NOT_SUCCESSFUL.to_string(),
            status: Some(status),
        }
    }

    pub fn shaping(err: &FormatError, data: Option<Payload>) -> Self {
        Self {
            reason: FailureReason::Error,
            data,
            msg: err.to_string(),
            status: None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {status})", self.msg),
            None => f.write_str(&self.msg),
        }
    }
}

pub type OnSuccess = Box<dyn FnOnce(Success)>;
pub type OnFailure = Box<dyn FnOnce(Failure)>;

struct Callbacks {
    on_success: OnSuccess,
    on_failure: OnFailure,
}

/// Shared terminal state of one dispatch.
///
/// The first `fulfill` or `reject` takes both callbacks and runs one of them;
/// every later attempt is a no-op that returns `false`. Clones share state.
#[derive(Clone)]
pub struct Settlement {
    callbacks: Rc<RefCell<Option<Callbacks>>>,
}

impl Settlement {
    pub fn new(on_success: OnSuccess, on_failure: OnFailure) -> Self {
        Self {
            callbacks: Rc::new(RefCell::new(Some(Callbacks {
                on_success,
                on_failure,
            }))),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.callbacks.borrow().is_none()
    }

    pub fn fulfill(&self, data: ResponseData) -> bool {
        self.settle(Ok(data))
    }

    pub fn reject(&self, failure: Failure) -> bool {
        self.settle(Err(failure))
    }

    pub fn settle(&self, result: Result<ResponseData, Failure>) -> bool {
        let callbacks = self.callbacks.borrow_mut().take();
        let Some(callbacks) = callbacks else {
            debug!(ok = result.is_ok(), "request already settled, dropping outcome");
            return false;
        };
        match result {
            Ok(data) => (callbacks.on_success)(Success { data }),
            Err(failure) => (callbacks.on_failure)(failure),
        }
        true
    }
}

impl fmt::Debug for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settlement")
            .field("settled", &self.is_settled())
            .finish()
    }
}
