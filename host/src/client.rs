//! Blocking ureq round-trips driven from the event loop.

use dualfetch_core::{HttpClient, HttpEvent, HttpMethod, HttpRequest, HttpResponse, HttpSink, RequestId};
use tracing::warn;

use crate::event_loop::{Delivery, EventLoop};

/// Execute `request` on the calling thread.
///
/// Status codes are returned as data (no status-as-error), so the core sees
/// every response. Expiry of `request.timeout` maps to `Delivery::TimedOut`.
pub fn execute(request: &HttpRequest) -> Delivery {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(request.timeout))
        .build()
        .new_agent();

    let result = match request.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&request.url);
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Post => {
            let mut builder = agent.post(&request.url);
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            match &request.body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = match result {
        Ok(response) => response,
        Err(ureq::Error::Timeout(_)) => return Delivery::TimedOut,
        Err(err) => return Delivery::Failed(err.to_string()),
    };

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    match response.body_mut().read_to_string() {
        Ok(body) => Delivery::Response(HttpResponse {
            status,
            headers,
            body,
        }),
        Err(ureq::Error::Timeout(_)) => Delivery::TimedOut,
        Err(err) => Delivery::Failed(err.to_string()),
    }
}

/// `HttpClient` that runs each request on a worker thread.
pub struct UreqClient {
    event_loop: EventLoop,
}

impl UreqClient {
    pub fn new(event_loop: EventLoop) -> Self {
        Self { event_loop }
    }
}

impl HttpClient for UreqClient {
    fn send(&self, request: HttpRequest, mut sink: HttpSink) -> RequestId {
        let then = move |delivery: Delivery| {
            let event = match delivery {
                Delivery::Response(response) => HttpEvent::Completed(response),
                Delivery::TimedOut => HttpEvent::TimedOut,
                Delivery::Failed(reason) => {
                    warn!(%reason, "request produced no response");
                    HttpEvent::Completed(HttpResponse {
                        status: 0,
                        headers: Vec::new(),
                        body: String::new(),
                    })
                }
            };
            sink(event);
        };
        let id = self.event_loop.spawn(move || execute(&request), Box::new(then));
        RequestId(id)
    }

    fn abort(&self, id: RequestId) {
        self.event_loop.cancel_job(id.0);
    }
}
