//! Request configuration and its validation.
//!
//! # Design
//! `RequestConfig` is the loose, caller-facing description of one request:
//! every field is optional so it can be built piecemeal or deserialized from a
//! camelCase JSON object. `validate` checks it once and produces a typed
//! `Request` with all defaults filled in.
//!
//! `mode` and `json_format` stay strings here because unrecognized values
//! have to be reported verbatim. `mode` is checked by `validate`;
//! `json_format` is only checked when a response is shaped.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::http::HttpMethod;
use crate::outcome::{Failure, OnFailure, OnSuccess, Settlement, Success};

pub const DEFAULT_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_FORMAT: &str = "text";
const MAX_INDENT: usize = 10;

/// Request body for ajax mode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PostData {
    /// Sent verbatim.
    Text(String),
    /// Form-url-encoded in insertion order.
    Form(IndexMap<String, String>),
}

/// Indentation unit for formatted output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Spacer {
    Text(String),
    Width(usize),
}

impl Default for Spacer {
    fn default() -> Self {
        Spacer::Text("\t".to_string())
    }
}

impl Spacer {
    /// The literal indent string. Both forms are capped at ten characters;
    /// an empty indent means compact output.
    pub fn indent(&self) -> String {
        match self {
            Spacer::Text(text) => text.chars().take(MAX_INDENT).collect(),
            Spacer::Width(width) => " ".repeat((*width).min(MAX_INDENT)),
        }
    }
}

/// What a replacer wants serialized in place of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// Serialize this value. Objects and arrays are walked again with the
    /// same replacer.
    Value(Value),
    /// Drop the member. Inside an array the slot becomes `null`.
    Omit,
    /// Something with no JSON form, such as a function. Treated like `Omit`.
    Opaque,
}

/// Per key/value transform applied while serializing formatted output.
/// Array elements are passed their index as the key; the root gets `""`.
pub type Replacer = Rc<dyn Fn(&str, &Value) -> Replacement>;

/// Caller-facing description of one request.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestConfig {
    /// `callback` or `ajax`.
    pub mode: Option<String>,
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    /// Entry point the remote script calls; required in callback mode.
    pub callback: Option<String>,
    pub timeout_ms: Option<u64>,
    pub headers: Option<IndexMap<String, String>>,
    pub post_data: Option<PostData>,
    /// `text`, `object`, `formatted_text` or `formatted_object`.
    pub json_format: Option<String>,
    pub json_whitelist: Option<HashSet<String>>,
    pub json_blacklist: Option<HashSet<String>>,
    #[serde(skip)]
    pub json_replacer: Option<Replacer>,
    pub json_spacer: Option<Spacer>,
    #[serde(skip)]
    pub on_success: Option<OnSuccess>,
    #[serde(skip)]
    pub on_failure: Option<OnFailure>,
}

impl RequestConfig {
    pub fn new(mode: &str, url: &str) -> Self {
        Self::default().mode(mode).url(url)
    }

    /// Parse a config from JSON. Callbacks and the replacer cannot be
    /// expressed in JSON and are left unset.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.to_string());
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn callback(mut self, name: &str) -> Self {
        self.callback = Some(name.to_string());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers
            .get_or_insert_with(IndexMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn post_data(mut self, data: PostData) -> Self {
        self.post_data = Some(data);
        self
    }

    pub fn json_format(mut self, format: &str) -> Self {
        self.json_format = Some(format.to_string());
        self
    }

    pub fn json_whitelist<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.json_whitelist = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn json_blacklist<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.json_blacklist = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn json_replacer(mut self, replacer: impl Fn(&str, &Value) -> Replacement + 'static) -> Self {
        self.json_replacer = Some(Rc::new(replacer));
        self
    }

    pub fn json_spacer(mut self, spacer: Spacer) -> Self {
        self.json_spacer = Some(spacer);
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(Success) + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl FnOnce(Failure) + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("mode", &self.mode)
            .field("url", &self.url)
            .field("method", &self.method)
            .field("callback", &self.callback)
            .field("timeout_ms", &self.timeout_ms)
            .field("headers", &self.headers)
            .field("post_data", &self.post_data)
            .field("json_format", &self.json_format)
            .field("json_whitelist", &self.json_whitelist)
            .field("json_blacklist", &self.json_blacklist)
            .field("json_replacer", &self.json_replacer.is_some())
            .field("json_spacer", &self.json_spacer)
            .finish_non_exhaustive()
    }
}

/// Which transport a validated request uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Callback { entry_point: String },
    Ajax,
}

/// Everything the response shaper needs.
#[derive(Clone)]
pub struct ShapeOptions {
    /// Unchecked format name, resolved at shaping time.
    pub format: String,
    pub whitelist: Option<HashSet<String>>,
    pub blacklist: Option<HashSet<String>>,
    pub replacer: Option<Replacer>,
    pub spacer: Spacer,
}

impl Default for ShapeOptions {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            whitelist: None,
            blacklist: None,
            replacer: None,
            spacer: Spacer::default(),
        }
    }
}

impl fmt::Debug for ShapeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeOptions")
            .field("format", &self.format)
            .field("whitelist", &self.whitelist)
            .field("blacklist", &self.blacklist)
            .field("replacer", &self.replacer.is_some())
            .field("spacer", &self.spacer)
            .finish()
    }
}

/// A validated request with every default applied.
#[derive(Debug)]
pub struct Request {
    pub mode: Mode,
    pub url: String,
    pub method: HttpMethod,
    pub timeout: Duration,
    pub headers: IndexMap<String, String>,
    pub post_data: Option<PostData>,
    pub shape: ShapeOptions,
    pub settlement: Settlement,
}

/// Check required fields and fill defaults.
///
/// Missing `url` and `mode` are reported together, in that order. Empty
/// strings count as missing, and a zero timeout counts as unset.
pub fn validate(config: RequestConfig) -> Result<Request, ConfigError> {
    let url = config.url.filter(|url| !url.is_empty());
    let mode = config.mode.filter(|mode| !mode.is_empty());

    let mut missing = Vec::new();
    if url.is_none() {
        missing.push("url");
    }
    if mode.is_none() {
        missing.push("mode");
    }
    let (Some(url), Some(mode)) = (url, mode) else {
        return Err(ConfigError::MissingParameters(missing));
    };

    let mode = match mode.as_str() {
        "callback" => Mode::Callback {
            entry_point: config
                .callback
                .filter(|name| !name.is_empty())
                .ok_or(ConfigError::MissingCallback)?,
        },
        "ajax" => Mode::Ajax,
        _ => return Err(ConfigError::InvalidMode(mode)),
    };

    let timeout_ms = config
        .timeout_ms
        .filter(|&ms| ms > 0)
        .unwrap_or(DEFAULT_TIMEOUT_MS);

    let settlement = Settlement::new(
        config.on_success.unwrap_or_else(|| Box::new(|_| {})),
        config.on_failure.unwrap_or_else(|| Box::new(|_| {})),
    );

    Ok(Request {
        mode,
        url,
        method: config.method.unwrap_or_default(),
        timeout: Duration::from_millis(timeout_ms),
        headers: config.headers.unwrap_or_default(),
        post_data: config.post_data,
        shape: ShapeOptions {
            format: config
                .json_format
                .filter(|format| !format.is_empty())
                .unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            whitelist: config.json_whitelist,
            blacklist: config.json_blacklist,
            replacer: config.json_replacer,
            spacer: config.json_spacer.unwrap_or_default(),
        },
        settlement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(config: RequestConfig) -> ConfigError {
        validate(config).unwrap_err()
    }

    #[test]
    fn missing_url_and_mode_are_listed_together() {
        let err = missing(RequestConfig::default());
        assert_eq!(err, ConfigError::MissingParameters(vec!["url", "mode"]));
        assert_eq!(err.to_string(), "missing required parameters: [url,mode]");
    }

    #[test]
    fn missing_only_mode() {
        let err = missing(RequestConfig::default().url("http://x"));
        assert_eq!(err, ConfigError::MissingParameters(vec!["mode"]));
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let err = missing(RequestConfig::new("", ""));
        assert_eq!(err, ConfigError::MissingParameters(vec!["url", "mode"]));
    }

    #[test]
    fn callback_mode_requires_callback_name() {
        let err = missing(RequestConfig::new("callback", "http://x"));
        assert_eq!(err, ConfigError::MissingCallback);
        assert_eq!(
            err.to_string(),
            "'mode: callback' was specified but no callback function was given."
        );
    }

    #[test]
    fn unknown_mode_is_named() {
        let err = missing(RequestConfig::new("websocket", "http://x"));
        assert_eq!(err, ConfigError::InvalidMode("websocket".to_string()));
        assert_eq!(err.to_string(), "invalid value for 'mode': \"websocket\"");
    }

    #[test]
    fn defaults_are_filled() {
        let request = validate(RequestConfig::new("ajax", "http://x")).unwrap();
        assert_eq!(request.mode, Mode::Ajax);
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.timeout, Duration::from_millis(2000));
        assert!(request.headers.is_empty());
        assert_eq!(request.shape.format, "text");
        assert_eq!(request.shape.spacer, Spacer::Text("\t".to_string()));
        assert!(!request.settlement.is_settled());
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let request = validate(RequestConfig::new("ajax", "http://x").timeout_ms(0)).unwrap();
        assert_eq!(request.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn json_format_is_not_checked_during_validation() {
        let request =
            validate(RequestConfig::new("ajax", "http://x").json_format("yaml")).unwrap();
        assert_eq!(request.shape.format, "yaml");
    }

    #[test]
    fn callback_mode_keeps_entry_point() {
        let request =
            validate(RequestConfig::new("callback", "http://x").callback("handle")).unwrap();
        assert_eq!(
            request.mode,
            Mode::Callback {
                entry_point: "handle".to_string()
            }
        );
    }

    #[test]
    fn deserializes_from_camel_case_json() {
        let config = RequestConfig::from_json(
            r#"{
                "mode": "ajax",
                "url": "http://x/api",
                "method": "POST",
                "timeoutMs": 500,
                "headers": {"X-One": "1", "X-Two": "2"},
                "postData": {"name": "a b"},
                "jsonFormat": "formatted_object",
                "jsonWhitelist": ["a", "c"],
                "jsonSpacer": 2
            }"#,
        )
        .unwrap();

        assert_eq!(config.method, Some(HttpMethod::Post));
        assert_eq!(config.timeout_ms, Some(500));
        let headers: Vec<_> = config.headers.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(headers, vec!["X-One", "X-Two"]);
        assert!(matches!(config.post_data, Some(PostData::Form(_))));
        assert_eq!(config.json_spacer, Some(Spacer::Width(2)));
        assert!(config.json_whitelist.as_ref().unwrap().contains("c"));
    }

    #[test]
    fn text_post_data_deserializes_verbatim() {
        let config = RequestConfig::from_json(r#"{"postData": "a=1&b=2"}"#).unwrap();
        assert_eq!(config.post_data, Some(PostData::Text("a=1&b=2".to_string())));
    }

    #[test]
    fn spacer_indent_is_capped() {
        assert_eq!(Spacer::Width(2).indent(), "  ");
        assert_eq!(Spacer::Width(40).indent(), " ".repeat(10));
        assert_eq!(Spacer::Text("-".repeat(12)).indent(), "-".repeat(10));
        assert_eq!(Spacer::Text(String::new()).indent(), "");
    }
}
