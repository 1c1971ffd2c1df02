use serde::Deserialize;

use rowsplit_api::config::ConfigValues;

/// One `[[extensions]]` entry: a property table addressed by namespace and name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtensionConfig {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub properties: Option<toml::Value>,
}

/// Lookup of extension property bags.
#[derive(Debug, Clone, Default)]
pub struct ExtensionConfigs {
    entries: Vec<ExtensionConfig>,
}

impl ExtensionConfigs {
    pub fn new(entries: Vec<ExtensionConfig>) -> Self {
        Self { entries }
    }

    /// Properties of the first entry matching `namespace` and `name` exactly.
    /// Matching entries without properties are passed over.
    ///
    /// Nested tables and arrays are flattened to JSON text.
    pub fn reader(&self, namespace: &str, name: &str) -> Option<ConfigValues> {
        let found = self
            .entries
            .iter()
            .filter(|e| e.namespace == namespace && e.name == name)
            .find_map(|e| e.properties.as_ref());

        match found {
            Some(props) => match serde_json::to_value(props) {
                Ok(json) => Some(ConfigValues::from_json(&json)),
                Err(e) => {
                    tracing::error!(namespace, name, error = %e, "unreadable extension properties");
                    None
                }
            },
            None => {
                tracing::debug!(namespace, name, "no matching extension configuration");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs() -> ExtensionConfigs {
        #[derive(Deserialize)]
        struct Root {
            extensions: Vec<ExtensionConfig>,
        }
        let root: Root = toml::from_str(
            r#"
            [[extensions]]
            namespace = "store"
            name = "rdbms"
            properties = { url = "jdbc:h2:mem", pool = 8, options = { ssl = true } }

            [[extensions]]
            namespace = "store"
            name = "rdbms"
            properties = { url = "shadowed" }

            [[extensions]]
            namespace = "sink"
            name = "log"
            "#,
        )
        .unwrap();
        ExtensionConfigs::new(root.extensions)
    }

    #[test]
    fn first_exact_match_wins() {
        let values = configs().reader("store", "rdbms").unwrap();
        assert_eq!(values.get_str("url"), Some("jdbc:h2:mem"));
        assert_eq!(values.get_i64("pool"), Some(8));
        assert_eq!(values.get_str("options"), Some(r#"{"ssl":true}"#));
    }

    #[test]
    fn no_match_or_no_properties() {
        let configs = configs();
        assert!(configs.reader("Store", "rdbms").is_none());
        assert!(configs.reader("store", "missing").is_none());
        assert!(configs.reader("sink", "log").is_none());
    }

    #[test]
    fn entry_without_properties_does_not_shadow() {
        let configs = ExtensionConfigs::new(vec![
            ExtensionConfig {
                namespace: "store".into(),
                name: "rdbms".into(),
                properties: None,
            },
            ExtensionConfig {
                namespace: "store".into(),
                name: "rdbms".into(),
                properties: Some(toml::Value::Table(toml::toml! { url = "jdbc:h2:file" })),
            },
        ]);
        let values = configs.reader("store", "rdbms").unwrap();
        assert_eq!(values.get_str("url"), Some("jdbc:h2:file"));
    }
}
