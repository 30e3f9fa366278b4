//! Fixture endpoints for exercising both fetch transports over real HTTP.
//!
//! `/jsonp` serves a script that calls the requested entry point with a JSON
//! object, the way a cross-origin JSONP endpoint would. Everything else is
//! plain JSON or text for the same-origin transport.

use std::time::Duration;

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub fn sample() -> Value {
    json!({"a": 1, "b": 2, "c": 3})
}

#[derive(Deserialize)]
pub struct JsonpParams {
    pub callback: String,
    /// Milliseconds to wait before answering.
    #[serde(default)]
    pub delay: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/data", get(data))
        .route("/list", get(list))
        .route("/text", get(text))
        .route("/status/{code}", get(status))
        .route("/slow/{ms}", get(slow))
        .route("/echo", get(echo).post(echo))
        .route("/jsonp", get(jsonp))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn data() -> Json<Value> {
    Json(sample())
}

async fn list() -> Json<Value> {
    Json(json!([1, 2, 3]))
}

async fn text() -> &'static str {
    "plain text, not json"
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, Json(json!({"status": code}))))
}

async fn slow(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({"slow": true, "ms": ms}))
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    let headers: serde_json::Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), Value::String(v.to_string())))
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "body": body,
    }))
}

async fn jsonp(Query(params): Query<JsonpParams>) -> impl IntoResponse {
    if params.delay > 0 {
        tokio::time::sleep(Duration::from_millis(params.delay)).await;
    }
    tracing::debug!(callback = %params.callback, "serving jsonp");
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        format!("{}({});", params.callback, sample()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonp_params_default_delay_to_zero() {
        let params: JsonpParams = serde_json::from_str(r#"{"callback":"cb"}"#).unwrap();
        assert_eq!(params.callback, "cb");
        assert_eq!(params.delay, 0);
    }

    #[test]
    fn jsonp_params_require_callback() {
        let result: Result<JsonpParams, _> = serde_json::from_str(r#"{"delay":5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn sample_has_three_keys() {
        assert_eq!(sample().as_object().unwrap().len(), 3);
    }
}
