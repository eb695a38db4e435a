use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Decoded response body from the VictorOps REST endpoint
///
/// The body is kept as the raw JSON object so callers can read any field the
/// service returns (`entity_id`, `message`, ...), not only `result`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertResponse(Map<String, Value>);

impl AlertResponse {
    /// The `result` field, normally `"success"` or `"failure"`
    pub fn result(&self) -> Option<&str> {
        self.get_str("result")
    }

    /// True when the service reported `result: "failure"`
    pub fn is_failure(&self) -> bool {
        self.result() == Some("failure")
    }

    /// Entity the service associated the alert with
    pub fn entity_id(&self) -> Option<&str> {
        self.get_str("entity_id")
    }

    /// Human readable message, present on most failure responses
    pub fn message(&self) -> Option<&str> {
        self.get_str("message")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for AlertResponse {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Display for AlertResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}
