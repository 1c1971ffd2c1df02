//! Aggregated event document: the deduplicated structure stored in the
//! data column of every record.
//!
//! ```json
//! {
//!   "messageFlowId": "F1",
//!   "events": [ { "severity": "null", "host": "a" }, ... ],
//!   "payloads": [
//!     { "payload": "HIGH", "events": [ { "eventIndex": 0, "attribute": "severity" } ] }
//!   ]
//! }
//! ```

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::EngineError;

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatedEventDocument {
    #[serde(rename = "messageFlowId")]
    pub message_flow_id: String,
    pub events: Vec<EventRecord>,
    /// Absent or `null` means no overflow values.
    #[serde(default)]
    pub payloads: Option<Vec<PayloadEntry>>,
}

/// One value stored once and shared by several `(event, attribute)` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadEntry {
    #[serde(rename = "payload")]
    pub value: String,
    #[serde(rename = "events")]
    pub refs: Vec<PayloadRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadRef {
    #[serde(rename = "eventIndex")]
    pub event_index: usize,
    pub attribute: String,
}

/// Unordered field bag of one logical event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct EventRecord(serde_json::Map<String, serde_json::Value>);

/// Result of looking a column up in an event.
#[derive(Debug, PartialEq, Eq)]
pub enum Field<'a> {
    /// The event has no such field.
    Absent,
    /// The field is JSON `null`.
    Null,
    /// The field's value, stringified.
    Value(Cow<'a, str>),
}

impl EventRecord {
    pub fn field(&self, name: &str) -> Field<'_> {
        match self.0.get(name) {
            None => Field::Absent,
            Some(serde_json::Value::Null) => Field::Null,
            Some(serde_json::Value::String(s)) => Field::Value(Cow::Borrowed(s)),
            Some(other) => Field::Value(Cow::Owned(other.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for EventRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        EventRecord(map)
    }
}

impl AggregatedEventDocument {
    /// Parse the data column value.
    ///
    /// Stores keep the document as JSON text; an already-structured object
    /// is accepted as well.
    pub fn from_column(value: &serde_json::Value) -> Result<Self, EngineError> {
        match value {
            serde_json::Value::String(text) => Ok(serde_json::from_str(text)?),
            serde_json::Value::Object(_) => Ok(Self::deserialize(value)?),
            other => Err(EngineError::malformed(format!(
                "expected a JSON document, found {}",
                json_type_name(other)
            ))),
        }
    }
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
