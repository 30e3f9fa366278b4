//! Same-origin transport: one asynchronous HTTP request.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::config::{PostData, Request};
use crate::env::Environment;
use crate::http::{encode_form, HttpEvent, HttpRequest, RequestId};
use crate::outcome::Failure;
use crate::shape::{self, Payload};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Build the plain-data request for a validated ajax call.
pub(crate) fn build_request(request: &Request) -> HttpRequest {
    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let body = match &request.post_data {
        None => None,
        Some(PostData::Text(text)) => Some(text.clone()),
        Some(PostData::Form(fields)) => {
            if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
                headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
            }
            Some(encode_form(fields))
        }
    };

    HttpRequest {
        method: request.method,
        url: request.url.clone(),
        headers,
        body,
        timeout: request.timeout,
    }
}

pub(crate) fn send(env: &Environment, request: Request) {
    let http_request = build_request(&request);
    let Request {
        shape: options,
        settlement,
        ..
    } = request;
    let in_flight: Rc<Cell<Option<RequestId>>> = Rc::new(Cell::new(None));

    let sink = {
        let http = env.http.clone();
        let in_flight = in_flight.clone();
        move |event: HttpEvent| {
            if settlement.is_settled() {
                debug!(?event, "ignoring event for settled request");
                return;
            }
            match event {
                HttpEvent::Completed(response) if response.status == 200 => {
                    let result = shape::shape(&options, Payload::Text(response.body))
                        .map_err(|err| Failure::shaping(&err, None));
                    settlement.settle(result);
                }
                HttpEvent::Completed(response) => {
                    debug!(status = response.status, "request did not succeed");
                    settlement.reject(Failure::unsuccessful(response.status));
                }
                HttpEvent::TimedOut => {
                    if let Some(id) = in_flight.get() {
                        http.abort(id);
                    }
                    settlement.reject(Failure::timeout());
                }
            }
        }
    };

    debug!(method = http_request.method.as_str(), url = %http_request.url, "sending request");
    let id = env.http.send(http_request, Box::new(sink));
    in_flight.set(Some(id));
}
