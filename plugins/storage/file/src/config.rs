// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

fn default_name() -> String {
    "file".to_string()
}

/// Layout: `{data_dir}/{tenant_id}/{table}/*.jsonl`, one JSON object per line.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct FileStoreConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub data_dir: String,
    /// Hostnames reported as preferred locations for every group.
    #[serde(default)]
    pub locations: Vec<String>,
}

impl FileStoreConfig {
    pub fn new(data_dir: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            data_dir: data_dir.into(),
            locations: Vec::new(),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Record group payload
// ════════════════════════════════════════════════════════════════

/// What a file record group points at.
#[derive(serde::Serialize, serde::Deserialize)]
pub(crate) struct GroupPayload {
    pub files: Vec<String>,
    pub columns: Vec<String>,
    pub from_ms: i64,
    pub to_ms: i64,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: Option<usize>,
}
