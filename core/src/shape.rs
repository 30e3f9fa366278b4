//! Response shaping: parse, filter, transform and re-serialize a payload.
//!
//! # Design
//! `text` and `object` are pass-through formats: `text` hands back whatever
//! arrived, `object` parses text into a JSON value. Neither applies the key
//! filters, the replacer or the spacer. Only `formatted_text` and
//! `formatted_object` run the full pipeline:
//!
//! 1. whitelist then blacklist over the top-level keys of an object,
//! 2. the replacer, depth first and top down, starting at the root with key `""`,
//! 3. serialization with the spacer as indentation unit,
//! 4. for `formatted_object`, parsing the text back into a value.

use std::str::FromStr;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::config::{Replacement, ShapeOptions};
use crate::error::FormatError;

/// A raw response as it reached the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// An HTTP body, or a string handed to a callback entry point.
    Text(String),
    /// A structured value handed to a callback entry point.
    Json(Value),
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// Shaped data handed to `on_success`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Text(String),
    Json(Value),
}

impl ResponseData {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            ResponseData::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            ResponseData::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonFormat {
    Text,
    Object,
    FormattedText,
    FormattedObject,
}

impl FromStr for JsonFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(JsonFormat::Text),
            "object" => Ok(JsonFormat::Object),
            "formatted_text" => Ok(JsonFormat::FormattedText),
            "formatted_object" => Ok(JsonFormat::FormattedObject),
            other => Err(FormatError::UnknownFormat(other.to_string())),
        }
    }
}

/// Turn `payload` into the shape `options.format` asks for.
pub fn shape(options: &ShapeOptions, payload: Payload) -> Result<ResponseData, FormatError> {
    match options.format.parse::<JsonFormat>()? {
        JsonFormat::Text => Ok(match payload {
            Payload::Text(text) => ResponseData::Text(text),
            Payload::Json(value) => ResponseData::Json(value),
        }),
        JsonFormat::Object => Ok(ResponseData::Json(into_value(payload)?)),
        JsonFormat::FormattedText => {
            let text = format(options, into_value(payload)?)?;
            Ok(ResponseData::Text(text))
        }
        JsonFormat::FormattedObject => {
            let text = format(options, into_value(payload)?)?;
            Ok(ResponseData::Json(serde_json::from_str(&text)?))
        }
    }
}

fn into_value(payload: Payload) -> Result<Value, FormatError> {
    match payload {
        Payload::Text(text) => Ok(serde_json::from_str(&text)?),
        Payload::Json(value) => Ok(value),
    }
}

fn format(options: &ShapeOptions, value: Value) -> Result<String, FormatError> {
    let filtered = filter_keys(options, value);
    let replaced = match &options.replacer {
        Some(replacer) => {
            replace("", &filtered, replacer.as_ref()).ok_or(FormatError::NothingToSerialize)?
        }
        None => filtered,
    };
    serialize(&replaced, &options.spacer.indent())
}

/// Apply the whitelist, then the blacklist, to the top-level keys of an
/// object. Anything else is returned untouched.
fn filter_keys(options: &ShapeOptions, value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    if let Some(whitelist) = &options.whitelist {
        map.retain(|key, _| whitelist.contains(key));
    }
    if let Some(blacklist) = &options.blacklist {
        map.retain(|key, _| !blacklist.contains(key));
    }
    Value::Object(map)
}

/// Run the replacer on `value`, then on the children of whatever it
/// returned. `None` means the value is dropped.
fn replace(key: &str, value: &Value, replacer: &dyn Fn(&str, &Value) -> Replacement) -> Option<Value> {
    let replaced = match replacer(key, value) {
        Replacement::Value(replaced) => replaced,
        Replacement::Omit | Replacement::Opaque => return None,
    };
    Some(match replaced {
        Value::Object(map) => {
            let mut out = Map::new();
            for (child_key, child) in &map {
                if let Some(child) = replace(child_key, child, replacer) {
                    out.insert(child_key.clone(), child);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    replace(&index.to_string(), item, replacer).unwrap_or(Value::Null)
                })
                .collect(),
        ),
        scalar => scalar,
    })
}

fn serialize(value: &Value, indent: &str) -> Result<String, FormatError> {
    if indent.is_empty() {
        return Ok(serde_json::to_string(value)?);
    }
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
