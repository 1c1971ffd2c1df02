use std::collections::BTreeMap;

/// A raw record fetched from the store: column name → value.
///
/// The engine only interprets the data column; every other column is opaque.
/// Owned by the iterator currently processing it, never shared.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    values: BTreeMap<String, serde_json::Value>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(column.into(), value.into());
    }

    /// Value of `column`. An explicit JSON `null` reads as absent.
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        match self.values.get(column) {
            Some(serde_json::Value::Null) | None => None,
            Some(v) => Some(v),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Keep only the given columns.
    pub fn project(mut self, columns: &[String]) -> Self {
        self.values.retain(|k, _| columns.iter().any(|c| c == k));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for RawRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { values: map.into_iter().collect() }
    }
}
