//! JSON encoding and decoding of error chains.
//!
//! An error encodes to an object:
//!
//! ```json
//! {
//!   "error": "read error",
//!   "stack": [{"name": "app::load", "file": "src/load.rs", "line": 12}],
//!   "user": "vader",
//!   "cause": {"error": "EOF"},
//!   "errors": [{"error": "first"}, {"error": "second"}]
//! }
//! ```
//!
//! Details are flattened into the object next to the reserved `error`,
//! `stack`, `cause` and `errors` keys; details using a reserved name are
//! dropped. Empty parts are omitted. Decoding rebuilds a generic chain of
//! [`Error`] values that encodes back to the same JSON.

use std::error::Error as StdError;
use std::io;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::construct::{new, wrap};
use crate::details::{all_details, links, Details};
use crate::error::{BoxError, Error, Repr};
use crate::foreign::Node;
use crate::stack::{Frame, Stack};
use crate::value::Value;

const ERROR_KEY: &str = "error";
const STACK_KEY: &str = "stack";
const CAUSE_KEY: &str = "cause";
const ERRORS_KEY: &str = "errors";

const RESERVED_KEYS: [&str; 4] = [ERROR_KEY, STACK_KEY, CAUSE_KEY, ERRORS_KEY];

// ============================================================
// Encoding
// ============================================================

/// Encode `err` as a JSON value.
pub fn to_json_value(err: &(dyn StdError + 'static)) -> crate::Result<JsonValue> {
    encode(err)
}

/// Encode `err` as a JSON string.
///
/// ```
/// let err = stackerr::base("not found");
/// assert_eq!(stackerr::to_json(&err).unwrap(), r#"{"error":"not found"}"#);
/// ```
pub fn to_json(err: &(dyn StdError + 'static)) -> crate::Result<String> {
    let value = encode(err)?;
    serde_json::to_string(&value).map_err(|e| wrap(e, "cannot marshal error"))
}

/// Encode `err` as JSON into `writer`.
pub fn to_writer<W: io::Write>(writer: W, err: &(dyn StdError + 'static)) -> crate::Result<()> {
    let value = encode(err)?;
    serde_json::to_writer(writer, &value).map_err(|e| wrap(e, "cannot write error"))
}

fn encode(err: &(dyn StdError + 'static)) -> crate::Result<JsonValue> {
    let node = Node::of(err);

    if let Some(marshaled) = node.marshal() {
        let value = marshaled.map_err(|e| wrap(e, "cannot marshal error"))?;
        if !is_trivial(&value) {
            return Ok(value);
        }
        tracing::debug!(error = %err, "custom error encoding is empty, using generic encoding");
    }

    let mut object = Map::new();

    for (key, value) in all_details(err) {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let value = serde_json::to_value(&value).map_err(|e| wrap(e, "cannot marshal error details"))?;
        object.insert(key, value);
    }

    let message = err.to_string();
    if !message.is_empty() {
        object.insert(ERROR_KEY.to_string(), JsonValue::String(message));
    }

    if let Some(trace) = node.stack_trace() {
        let frames = trace.frames();
        if !frames.is_empty() {
            let frames = serde_json::to_value(&*frames).map_err(|e| wrap(e, "cannot marshal stack"))?;
            object.insert(STACK_KEY.to_string(), frames);
        }
    }

    let (cause, joined) = links(err);
    if let Some(cause) = cause {
        let cause = encode(cause)?;
        if !is_empty_object(&cause) {
            object.insert(CAUSE_KEY.to_string(), cause);
        }
    }
    if !joined.is_empty() {
        let errors = joined.into_iter().map(encode).collect::<crate::Result<Vec<_>>>()?;
        object.insert(ERRORS_KEY.to_string(), JsonValue::Array(errors));
    }

    Ok(JsonValue::Object(object))
}

fn is_trivial(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Bool(_) | JsonValue::Number(_) => false,
    }
}

fn is_empty_object(value: &JsonValue) -> bool {
    matches!(value, JsonValue::Object(map) if map.is_empty())
}

// ============================================================
// Decoding
// ============================================================

/// Decode an error from a JSON string.
///
/// The result has the message, stack, details, cause and joined errors of
/// the encoded chain; concrete foreign types are not recovered.
///
/// ```
/// let err = stackerr::from_json(r#"{"error":"read error","cause":{"error":"EOF"}}"#).unwrap();
/// assert_eq!(err.to_string(), "read error");
/// assert_eq!(err.cause().unwrap().to_string(), "EOF");
/// ```
pub fn from_json(input: &str) -> crate::Result<Error> {
    let value: JsonValue = serde_json::from_str(input).map_err(|e| {
        tracing::debug!(error = %e, "cannot parse error JSON");
        wrap(e, "cannot unmarshal error")
    })?;
    from_json_value(value)
}

/// Decode an error from a JSON value.
pub fn from_json_value(value: JsonValue) -> crate::Result<Error> {
    let mut object = match value {
        JsonValue::Object(object) => object,
        other => {
            return Err(new(format!("cannot unmarshal error: expected an object, got {}", other)));
        }
    };

    let message = match object.remove(ERROR_KEY) {
        None => String::new(),
        Some(JsonValue::String(message)) => message,
        Some(other) => {
            return Err(new(format!("cannot unmarshal error: \"error\" must be a string, got {}", other)));
        }
    };

    let stack = match object.remove(STACK_KEY) {
        None => None,
        Some(frames) => {
            let frames: Vec<Frame> =
                serde_json::from_value(frames).map_err(|e| wrap(e, "cannot unmarshal stack"))?;
            Some(Stack::from_frames(frames))
        }
    };

    let cause = match object.remove(CAUSE_KEY) {
        None => None,
        Some(cause) => Some(BoxError::from(
            from_json_value(cause).map_err(|e| wrap(e, "cannot unmarshal cause"))?,
        )),
    };

    let errors = match object.remove(ERRORS_KEY) {
        None => Vec::new(),
        Some(JsonValue::Array(items)) => items
            .into_iter()
            .map(|item| from_json_value(item).map(BoxError::from))
            .collect::<crate::Result<Vec<_>>>()
            .map_err(|e| wrap(e, "cannot unmarshal joined errors"))?,
        Some(other) => {
            return Err(new(format!("cannot unmarshal error: \"errors\" must be an array, got {}", other)));
        }
    };

    let details: Details = object.into_iter().map(|(key, value)| (key, Value::from(value))).collect();

    Ok(Error::with_details(
        Repr::Decoded {
            message,
            stack,
            cause,
            errors,
        },
        details,
    ))
}

// ============================================================
// Serde support
// ============================================================

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_json_value(self)
            .map_err(|e| S::Error::custom(format!("{:.1}", e)))?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Error {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        from_json_value(value).map_err(|e| D::Error::custom(format!("{:.1}", e)))
    }
}
