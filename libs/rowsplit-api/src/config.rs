/// Typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
}

impl ParamValue {
    /// Convert a JSON scalar. Arrays and objects are kept as their JSON text;
    /// `null` becomes an empty string.
    pub fn from_json(val: &serde_json::Value) -> Self {
        match val {
            serde_json::Value::Bool(b) => ParamValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::I64(i)
                } else if let Some(u) = n.as_u64() {
                    ParamValue::U64(u)
                } else {
                    ParamValue::F64(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => ParamValue::Str(s.clone()),
            serde_json::Value::Null => ParamValue::Str(String::new()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                ParamValue::Str(val.to_string())
            }
        }
    }
}

/// Named property bag handed to extensions.
///
/// Built from a config table; read via typed getters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigValues {
    entries: Vec<(String, ParamValue)>,
}

impl ConfigValues {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from a JSON object; non-object input yields an empty bag.
    pub fn from_json(obj: &serde_json::Value) -> Self {
        let mut values = Self::new();
        if let serde_json::Value::Object(map) = obj {
            for (k, v) in map {
                values.set(k.clone(), ParamValue::from_json(v));
            }
        }
        values
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == &name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(ParamValue::I64(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(ParamValue::U64(v)) => Some(*v),
            // Most config formats lack unsigned integers: accept non-negative i64.
            Some(ParamValue::I64(v)) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(ParamValue::F64(v)) => Some(*v),
            Some(ParamValue::I64(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ParamValue::Str(v)) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_getters() {
        let values = ConfigValues::from_json(&json!({
            "host": "db-1",
            "port": 7611,
            "tls": true,
            "ratio": 0.5,
            "tags": ["a", "b"],
        }));
        assert_eq!(values.get_str("host"), Some("db-1"));
        assert_eq!(values.get_i64("port"), Some(7611));
        assert_eq!(values.get_u64("port"), Some(7611));
        assert_eq!(values.get_bool("tls"), Some(true));
        assert_eq!(values.get_f64("ratio"), Some(0.5));
        assert_eq!(values.get_str("tags"), Some(r#"["a","b"]"#));
        assert_eq!(values.get_str("port"), None);
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn negative_is_not_unsigned() {
        let values = ConfigValues::from_json(&json!({ "n": -1 }));
        assert_eq!(values.get_u64("n"), None);
        assert_eq!(values.get_i64("n"), Some(-1));
    }

    #[test]
    fn set_overwrites() {
        let mut values = ConfigValues::new();
        values.set("k", ParamValue::Str("a".into()));
        values.set("k", ParamValue::Str("b".into()));
        assert_eq!(values.get_str("k"), Some("b"));
        assert_eq!(values.names().count(), 1);
    }
}
