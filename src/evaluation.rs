use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::EvaluationContext;

/// Toggle states returned by `POST /toggle/evaluate`, keyed by toggle key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    /// Evaluations keyed by toggle key.
    pub toggles: HashMap<String, Evaluation>,
}

impl EvaluationResponse {
    /// Get the evaluation of a toggle.
    pub fn get(&self, toggle_key: &str) -> Option<&Evaluation> {
        self.toggles.get(toggle_key)
    }
}

/// The server's verdict for a single toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Toggle key.
    pub key: String,
    /// Raw value. Not authoritative when `error_message` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<EvaluationValue>,
    /// Declared type of the value. Not authoritative when `error_message` is set.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<EvaluationType>,
    /// Reason code reported by the server.
    #[serde(default)]
    pub reason: String,
    /// Set when the server failed to evaluate the toggle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Declared type of a toggle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationType {
    #[allow(missing_docs)]
    Boolean,
    #[allow(missing_docs)]
    String,
    #[allow(missing_docs)]
    Number,
    #[allow(missing_docs)]
    Object,
    /// A type this client does not know about. None of the typed accessors match it.
    #[serde(other)]
    Unknown,
}

/// Value of a toggle.
///
/// Untagged, so the exact kind is only known in combination with [`EvaluationType`]. Object
/// toggles may arrive either as a JSON object or as a string holding JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum EvaluationValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Object(serde_json::Map<String, serde_json::Value>),
    /// Any other JSON value (e.g. an array). Kept so that one odd toggle does not fail the
    /// whole response; typed accessors return `None` for it.
    Other(serde_json::Value),
}

impl From<&str> for EvaluationValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl Evaluation {
    /// Server-side error message, if the evaluation failed. Empty messages count as no error.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref().filter(|message| !message.is_empty())
    }

    /// Whether the server failed to evaluate the toggle.
    pub fn is_error(&self) -> bool {
        self.error_message().is_some()
    }

    /// The value, if it is authoritative and tagged with `value_type`.
    fn typed_value(&self, value_type: EvaluationType) -> Option<&EvaluationValue> {
        if self.is_error() || self.value_type != Some(value_type) {
            return None;
        }
        self.value.as_ref()
    }

    /// Value of a `boolean` toggle.
    pub fn as_boolean(&self) -> Option<bool> {
        match self.typed_value(EvaluationType::Boolean)? {
            EvaluationValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Value of a `string` toggle.
    pub fn as_str(&self) -> Option<&str> {
        match self.typed_value(EvaluationType::String)? {
            EvaluationValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Value of a `number` toggle.
    pub fn as_number(&self) -> Option<f64> {
        match self.typed_value(EvaluationType::Number)? {
            EvaluationValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Value of an `object` toggle. String values are parsed as JSON.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self.typed_value(EvaluationType::Object)? {
            EvaluationValue::Object(map) => Some(serde_json::Value::Object(map.clone())),
            EvaluationValue::String(s) => serde_json::from_str(s)
                .inspect_err(|err| {
                    log::warn!(target: "hyphen",
                               toggle_key:display = self.key;
                               "object toggle holds invalid json: {:?}", err);
                })
                .ok(),
            _ => None,
        }
    }
}

/// A record of a single resolved toggle usage, sent to `POST /toggle/telemetry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// The context the toggle was resolved for.
    pub context: EvaluationContext,
    #[allow(missing_docs)]
    pub data: TelemetryData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TelemetryData {
    pub toggle: Evaluation,
}

impl TelemetryPayload {
    /// Create a payload describing one usage of `toggle` for `context`.
    pub fn new(context: EvaluationContext, toggle: Evaluation) -> Self {
        TelemetryPayload {
            context,
            data: TelemetryData { toggle },
        }
    }
}
