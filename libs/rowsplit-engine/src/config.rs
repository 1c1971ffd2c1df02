use std::collections::HashSet;

use serde::Deserialize;

use rowsplit_api::columns::{COMPONENT_INDEX, DATA_COLUMN, DEFAULT_PARTITION_COUNT, MESSAGE_FLOW_ID};

use crate::error::EngineError;
use crate::extension::ExtensionConfig;

/// Run configuration, parsed from TOML.
///
/// Shared read-only by every partition of the run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub tenant_id: i64,
    pub table: String,

    /// Output schema. Order is the order of values in every row.
    pub columns: Vec<String>,

    /// Column holding the aggregated event document.
    #[serde(default = "default_data_column")]
    pub data_column: String,

    /// Partitions to request when no hint is configured.
    #[serde(default = "default_partitions")]
    pub default_partitions: usize,

    /// Fixed partition-count hint.
    #[serde(default)]
    pub partitions_hint: Option<usize>,

    /// Upper bound on concurrently computed partitions. Defaults to all of them.
    #[serde(default)]
    pub max_parallel: Option<usize>,

    pub store: StoreConfig,

    /// Named property bags for extensions.
    #[serde(default)]
    pub extensions: Vec<ExtensionConfig>,
}

fn default_data_column() -> String {
    DATA_COLUMN.to_string()
}

fn default_partitions() -> usize {
    DEFAULT_PARTITION_COUNT
}

/// Directory-backed record store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_name")]
    pub name: String,
    pub data_dir: String,
    /// Hostnames reported as preferred locations for every group.
    #[serde(default)]
    pub locations: Vec<String>,
}

fn default_store_name() -> String {
    "file".to_string()
}

impl RunConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.table.is_empty() {
            return Err(EngineError::Config("table must not be empty".into()));
        }
        if self.columns.is_empty() {
            return Err(EngineError::Config("columns must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column_key(column)) {
                return Err(EngineError::Config(format!("duplicate column '{column}'")));
            }
        }
        if self.default_partitions == 0 {
            return Err(EngineError::Config("default_partitions must be at least 1".into()));
        }
        if self.max_parallel == Some(0) {
            return Err(EngineError::Config("max_parallel must be at least 1".into()));
        }
        for ext in &self.extensions {
            if ext.namespace.is_empty() || ext.name.is_empty() {
                return Err(EngineError::Config(
                    "extension namespace and name must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Identity of an output column: markers ignore case, event attributes do not.
fn column_key(column: &str) -> &str {
    if column.eq_ignore_ascii_case(COMPONENT_INDEX) {
        COMPONENT_INDEX
    } else if column.eq_ignore_ascii_case(MESSAGE_FLOW_ID) {
        MESSAGE_FLOW_ID
    } else {
        column
    }
}
