use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /echo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoPayload {
    pub message: String,
}

impl EchoPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of a successful `POST /echo` response, exactly as decoded
///
/// Any JSON value is accepted and kept unmodified; the requester does not
/// check the shape. The accessors read the usual fields leniently and
/// [`EchoResponse::display_fields`] applies the presentation defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EchoResponse {
    value: Value,
}

impl From<Value> for EchoResponse {
    fn from(value: Value) -> Self {
        Self { value }
    }
}

impl EchoResponse {
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Top-level field of an object body, `None` for anything else
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    pub fn message(&self) -> Option<&str> {
        self.get("message").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.get("version").and_then(Value::as_str)
    }

    pub fn commit(&self) -> Option<&str> {
        self.get("commit").and_then(Value::as_str)
    }

    pub fn env(&self) -> Option<&str> {
        self.get("env").and_then(Value::as_str)
    }

    /// `[message, version, commit, env]` as display text
    ///
    /// Missing, `null`, `false`, `0` and `""` render as `""`; other scalars
    /// render as their JSON text, strings without quotes.
    pub fn display_fields(&self) -> [String; 4] {
        ["message", "version", "commit", "env"].map(|field| display_text(self.get(field)))
    }
}

fn display_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Body of a successful `GET /healthz` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    /// Pulls a usable status out of a decoded body.
    ///
    /// Only a non-empty string counts; `null`, `false`, `0`, `""` and
    /// non-string values are treated as missing.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.get("status") {
            Some(Value::String(status)) if !status.is_empty() => Some(Self {
                status: status.clone(),
            }),
            _ => None,
        }
    }
}
