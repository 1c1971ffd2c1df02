use crate::error::StoreError;
use crate::record::RawRecord;

/// Parameters of a record-group listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub tenant_id: i64,
    pub table: String,
    /// Number of record groups the caller would like back. Stores may return fewer.
    pub partition_hint: usize,
    /// Columns to project into every streamed record.
    pub columns: Vec<String>,
    /// Inclusive lower time bound (ms).
    pub from_ms: i64,
    /// Inclusive upper time bound (ms).
    pub to_ms: i64,
    pub offset: usize,
    /// `None` means no row limit.
    pub limit: Option<usize>,
}

/// Opaque handle to a slice of a table, as handed out by a store.
///
/// The engine never looks inside `payload`; only the store that produced
/// the group interprets it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecordGroup {
    pub id: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RecordGroup {
    pub fn new(id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { id: id.into(), payload }
    }
}

/// Result of a record-group listing.
#[derive(Debug, Clone)]
pub struct RecordGroups {
    pub store_name: String,
    pub groups: Vec<RecordGroup>,
}

/// Pull-based record sequence. Pulling may block on remote I/O.
pub type RecordIter = Box<dyn Iterator<Item = Result<RawRecord, StoreError>> + Send>;

/// Storage collaborator.
///
/// The engine doesn't know concrete implementations; it is handed one at
/// construction time and calls it from planning and partition workers
/// concurrently.
pub trait RecordStore: Send + Sync {
    /// List the record groups covering a query.
    fn list_record_groups(&self, query: &RecordQuery) -> Result<RecordGroups, StoreError>;

    /// Stream the records of one group.
    fn read_records(&self, store_name: &str, group: &RecordGroup) -> Result<RecordIter, StoreError>;

    /// Hostnames holding the group's data. Fails with `ErrorKind::DataAccess`
    /// on connectivity or store faults.
    fn locations_of(&self, group: &RecordGroup) -> Result<Vec<String>, StoreError>;
}

/// Partition-count hint service.
pub trait PartitionHint: Send + Sync {
    fn num_partitions_hint(&self) -> Result<usize, StoreError>;
}

/// Hint service answering with a constant.
#[derive(Debug, Clone, Copy)]
pub struct FixedHint(pub usize);

impl PartitionHint for FixedHint {
    fn num_partitions_hint(&self) -> Result<usize, StoreError> {
        Ok(self.0)
    }
}
