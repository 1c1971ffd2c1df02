use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use rowsplit_api::columns::TIMESTAMP_COLUMN;
use rowsplit_api::error::StoreError;
use rowsplit_api::record::RawRecord;
use rowsplit_api::storage::{RecordGroup, RecordGroups, RecordIter, RecordQuery, RecordStore};

// ═══════════════════════════════════════════════════════════════
//  MemoryStoreConfig
// ═══════════════════════════════════════════════════════════════

fn default_name() -> String {
    "memory".to_string()
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MemoryStoreConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Reported for every record group.
    #[serde(default)]
    pub locations: Vec<String>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            locations: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Faults
// ═══════════════════════════════════════════════════════════════

/// Injected failures, for exercising error paths.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub list: bool,
    pub open: bool,
    pub locations: bool,
    /// Fail streaming after this many records.
    pub stream_after: Option<usize>,
}

// ═══════════════════════════════════════════════════════════════
//  MemoryStore
// ═══════════════════════════════════════════════════════════════

type TableKey = (i64, String);

/// In-memory record store. Tables are keyed by tenant and name; listing
/// splits a table into contiguous record groups.
pub struct MemoryStore {
    config: MemoryStoreConfig,
    tables: RwLock<HashMap<TableKey, Vec<RawRecord>>>,
    faults: Mutex<Faults>,
}

/// What a memory record group points at.
#[derive(serde::Serialize, serde::Deserialize)]
struct GroupPayload {
    tenant_id: i64,
    table: String,
    rows: Vec<usize>,
    columns: Vec<String>,
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            tables: RwLock::new(HashMap::new()),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Build from a JSON config string; `"{}"` means defaults.
    pub fn from_config_json(config_json: &str) -> Result<Self, StoreError> {
        let config: MemoryStoreConfig = if config_json == "{}" {
            MemoryStoreConfig::default()
        } else {
            serde_json::from_str(config_json)?
        };
        Ok(Self::new(config))
    }

    /// Append records to a table, creating it if needed.
    pub fn insert(&self, tenant_id: i64, table: &str, records: impl IntoIterator<Item = RawRecord>) {
        let mut guard = match self.tables.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("memory store write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard
            .entry((tenant_id, table.to_string()))
            .or_default()
            .extend(records);
    }

    pub fn set_faults(&self, faults: Faults) {
        match self.faults.lock() {
            Ok(mut g) => *g = faults,
            Err(poisoned) => *poisoned.into_inner() = faults,
        }
    }

    fn faults(&self) -> Faults {
        match self.faults.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn with_table<T>(
        &self,
        tenant_id: i64,
        table: &str,
        f: impl FnOnce(&[RawRecord]) -> T,
    ) -> Result<T, StoreError> {
        let guard = match self.tables.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("memory store read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard
            .get(&(tenant_id, table.to_string()))
            .map(|records| f(records))
            .ok_or_else(|| StoreError::data_access(format!("table not found: {tenant_id}/{table}")))
    }
}

fn in_time_range(record: &RawRecord, from_ms: i64, to_ms: i64) -> bool {
    match record.get(TIMESTAMP_COLUMN).and_then(|v| v.as_i64()) {
        Some(ts) => ts >= from_ms && ts <= to_ms,
        None => true,
    }
}

/// Split `rows` into `parts` contiguous, nearly equal chunks (no empty chunk).
fn split_even(rows: Vec<usize>, parts: usize) -> Vec<Vec<usize>> {
    if rows.is_empty() {
        return Vec::new();
    }
    let parts = parts.clamp(1, rows.len());
    let base = rows.len() / parts;
    let extra = rows.len() % parts;
    let mut out = Vec::with_capacity(parts);
    let mut iter = rows.into_iter();
    for i in 0..parts {
        let size = base + usize::from(i < extra);
        out.push(iter.by_ref().take(size).collect());
    }
    out
}

impl RecordStore for MemoryStore {
    fn list_record_groups(&self, query: &RecordQuery) -> Result<RecordGroups, StoreError> {
        if self.faults().list {
            return Err(StoreError::data_access("injected listing failure"));
        }

        let rows = self.with_table(query.tenant_id, &query.table, |records| {
            records
                .iter()
                .enumerate()
                .filter(|(_, r)| in_time_range(r, query.from_ms, query.to_ms))
                .map(|(i, _)| i)
                .skip(query.offset)
                .take(query.limit.unwrap_or(usize::MAX))
                .collect::<Vec<_>>()
        })?;

        let groups = split_even(rows, query.partition_hint)
            .into_iter()
            .enumerate()
            .map(|(i, rows)| {
                let payload = GroupPayload {
                    tenant_id: query.tenant_id,
                    table: query.table.clone(),
                    rows,
                    columns: query.columns.clone(),
                };
                serde_json::to_value(payload)
                    .map(|payload| RecordGroup::new(format!("{}-{i}", query.table), payload))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordGroups {
            store_name: self.config.name.clone(),
            groups,
        })
    }

    fn read_records(&self, store_name: &str, group: &RecordGroup) -> Result<RecordIter, StoreError> {
        let faults = self.faults();
        if faults.open {
            return Err(StoreError::data_access("injected open failure"));
        }
        if store_name != self.config.name {
            return Err(StoreError::config(format!(
                "group '{}' belongs to store '{store_name}', not '{}'",
                group.id, self.config.name
            )));
        }

        let payload: GroupPayload = serde_json::from_value(group.payload.clone())?;
        let records = self.with_table(payload.tenant_id, &payload.table, |records| {
            payload
                .rows
                .iter()
                .filter_map(|&i| records.get(i))
                .map(|r| r.clone().project(&payload.columns))
                .collect::<Vec<_>>()
        })?;

        let fail_after = faults.stream_after;
        let iter = records.into_iter().enumerate().map(move |(i, record)| match fail_after {
            Some(n) if i >= n => Err(StoreError::data_access("injected stream failure")),
            _ => Ok(record),
        });
        Ok(Box::new(iter))
    }

    fn locations_of(&self, _group: &RecordGroup) -> Result<Vec<String>, StoreError> {
        if self.faults().locations {
            return Err(StoreError::data_access("injected location failure"));
        }
        Ok(self.config.locations.clone())
    }
}
