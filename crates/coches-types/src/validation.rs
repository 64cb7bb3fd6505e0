//! Request body decoding and field checks.

use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a request body cannot be turned into a [`crate::NewCar`] or
/// [`crate::CarPatch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No body, a blank body, or an empty JSON object.
    #[error("request body is empty")]
    EmptyBody,

    /// The body is not valid JSON.
    #[error("malformed JSON body: {0}")]
    Malformed(String),

    /// The body is valid JSON but not an object.
    #[error("request body must be a JSON object")]
    NotAnObject,

    /// Required fields are absent.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Keys outside `marca`, `modelo`, `anio`.
    #[error("invalid fields: {}", .0.join(", "))]
    UnknownFields(Vec<String>),

    /// A known field holds an unusable value.
    #[error("field '{field}' is invalid: {reason}")]
    InvalidField {
        /// The offending key.
        field: String,
        /// Human-readable explanation.
        reason: String,
    },
}

/// Parses a raw body into a JSON object.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyBody`] for a blank body or `{}`,
/// [`ValidationError::Malformed`] for invalid JSON and
/// [`ValidationError::NotAnObject`] for any other JSON value.
pub fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::EmptyBody);
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    match value {
        Value::Object(map) if map.is_empty() => Err(ValidationError::EmptyBody),
        Value::Object(map) => Ok(map),
        Value::Null => Err(ValidationError::EmptyBody),
        _ => Err(ValidationError::NotAnObject),
    }
}

/// Reads a string field as-is, empty strings included. Absent and `null` both
/// yield `None`.
pub(crate) fn string_field(
    body: &Map<String, Value>,
    name: &str,
) -> Result<Option<String>, ValidationError> {
    match body.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(name, "expected a string")),
    }
}

/// Reads an integer year that fits in `i32`. Absent and `null` both yield `None`.
pub(crate) fn year_field(
    body: &Map<String, Value>,
    name: &str,
) -> Result<Option<i32>, ValidationError> {
    match body.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| invalid(name, "expected an integer year")),
        Some(_) => Err(invalid(name, "expected an integer year")),
    }
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
