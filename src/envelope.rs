use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::{RelayError, Result};

/// JSON object the backend returns for every relayed request.
///
/// Every field is optional on the wire. `success` follows JavaScript
/// truthiness, so `1` or `"yes"` count as success and `0`, `""` or `null`
/// do not. Empty `message`/`log` strings are treated as missing.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ResponseEnvelope {
    #[serde(default, deserialize_with = "truthy")]
    pub success: bool,
    #[serde(default, deserialize_with = "non_empty_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "non_empty_text")]
    pub log: Option<String>,
}

impl ResponseEnvelope {
    /// Decodes a response body. Anything other than a JSON object is an error.
    pub fn from_body(body: &str) -> Result<Self> {
        serde_json::from_str::<Self>(body).map_err(|err| {
            RelayError::Decode(format!("invalid envelope JSON: {err}; body: {body}"))
        })
    }
}

fn truthy<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(|value| is_truthy(&value))
}

/// Falsy values (`false`, `0`, `""`, `null`) count as missing text.
fn non_empty_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        value if !is_truthy(&value) => None,
        JsonValue::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        JsonValue::String(text) => !text.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}
