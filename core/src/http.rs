//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The same-origin transport builds an
//! `HttpRequest` and hands it to the host's `HttpClient`; the host performs
//! the round-trip and reports back through an `HttpSink`. Nothing in this
//! crate touches the network.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `timeout` is the transport-level deadline: a client that has not received
/// the full response by then reports `HttpEvent::TimedOut`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

/// An HTTP response described as plain data.
///
/// A `status` of 0 means the request never produced a response (connection
/// refused, DNS failure), mirroring what browsers report.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Notifications a host client emits for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpEvent {
    Completed(HttpResponse),
    TimedOut,
}

/// Host-assigned handle for an in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Receives every event for one request. May be called more than once; the
/// transport ignores anything after the first terminal event.
pub type HttpSink = Box<dyn FnMut(HttpEvent)>;

/// Asynchronous one-shot HTTP client provided by the host.
pub trait HttpClient {
    /// Start `request`. Events are delivered to `sink` later, from the host's
    /// event loop, never from inside this call.
    fn send(&self, request: HttpRequest, sink: HttpSink) -> RequestId;

    /// Best-effort cancellation. An aborted request should not emit further
    /// events, though the transport tolerates it if one slips through.
    fn abort(&self, id: RequestId);
}

/// Encode `fields` as `application/x-www-form-urlencoded`: keys and values
/// percent-encoded, joined by `&` in insertion order.
pub fn encode_form(fields: &IndexMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
