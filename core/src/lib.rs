//! Dual-transport remote data fetching with response shaping.
//!
//! # Overview
//! One configuration-driven entry point, [`dispatch`], fetches remote data
//! either through an asynchronous HTTP request (`ajax` mode) or through an
//! injected script that calls back into a registered entry point (`callback`
//! mode, JSONP style). The payload is then shaped (parsed, filtered by key
//! allow/deny lists, transformed and re-serialized) and delivered to exactly
//! one of the caller's `on_success` / `on_failure` callbacks.
//!
//! # Design
//! - Host-does-IO: the crate never touches the network. Hosts implement
//!   [`HttpClient`], [`ScriptLoader`] and [`Timer`] and route script
//!   callbacks into the [`CallbackRegistry`].
//! - Single-threaded and event-driven; shared state is `Rc`/`RefCell`.
//! - Configuration errors return synchronously from `dispatch`. Everything
//!   else is delivered once, asynchronously, through the callbacks.

pub mod config;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod http;
pub mod outcome;
pub mod registry;
pub mod shape;

mod cross_origin;
mod same_origin;

#[cfg(test)]
mod fakes;

pub use config::{validate, Mode, PostData, Replacement, Replacer, Request, RequestConfig, ShapeOptions, Spacer};
pub use dispatch::{dispatch, Dispatcher};
pub use env::{Environment, ScriptId, ScriptLoader, ScriptTag, Timer, TimerId};
pub use error::{ConfigError, DeliveryError, FormatError};
pub use http::{HttpClient, HttpEvent, HttpMethod, HttpRequest, HttpResponse, HttpSink, RequestId};
pub use outcome::{Failure, FailureReason, Settlement, Success};
pub use registry::{CallbackRegistry, CallbackToken};
pub use shape::{shape, JsonFormat, Payload, ResponseData};
