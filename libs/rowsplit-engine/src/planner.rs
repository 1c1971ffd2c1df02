use std::sync::Arc;

use rowsplit_api::columns::{DATA_COLUMN, DEFAULT_PARTITION_COUNT};
use rowsplit_api::error::StoreError;
use rowsplit_api::storage::{PartitionHint, RecordGroup, RecordQuery, RecordStore};

use crate::error::EngineError;

/// One unit of parallel work: a record group and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionDescriptor {
    pub store_name: String,
    pub record_group: RecordGroup,
    /// Position in the plan.
    pub index: usize,
}

/// Turns a table into partition descriptors, once per run, on the control path.
pub struct PartitionPlanner {
    store: Arc<dyn RecordStore>,
    hint: Option<Arc<dyn PartitionHint>>,
    default_partitions: usize,
    data_column: String,
}

impl std::fmt::Debug for PartitionPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionPlanner")
            .field("has_hint", &self.hint.is_some())
            .field("default_partitions", &self.default_partitions)
            .field("data_column", &self.data_column)
            .finish()
    }
}

impl PartitionPlanner {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            hint: None,
            default_partitions: DEFAULT_PARTITION_COUNT,
            data_column: DATA_COLUMN.to_string(),
        }
    }

    pub fn with_hint(mut self, hint: Arc<dyn PartitionHint>) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_default_partitions(mut self, n: usize) -> Self {
        self.default_partitions = n.max(1);
        self
    }

    pub fn with_data_column(mut self, column: impl Into<String>) -> Self {
        self.data_column = column.into();
        self
    }

    /// Columns requested from the store: `all_columns` plus the data column.
    pub fn query_columns(&self, all_columns: &[String]) -> Vec<String> {
        let mut columns = all_columns.to_vec();
        if !columns.iter().any(|c| c == &self.data_column) {
            columns.push(self.data_column.clone());
        }
        columns
    }

    /// Number of partitions to ask the store for.
    pub fn partition_count(&self) -> Result<usize, StoreError> {
        match &self.hint {
            Some(hint) => {
                let n = hint
                    .num_partitions_hint()
                    .map_err(|e| e.with_context("partition hint"))?;
                if n == 0 {
                    tracing::warn!("partition hint was 0, requesting 1 partition");
                }
                Ok(n.max(1))
            }
            None => Ok(self.default_partitions),
        }
    }

    /// List the table's record groups and describe one partition per group,
    /// in store order.
    ///
    /// Any store failure aborts the plan.
    pub fn plan(
        &self,
        tenant_id: i64,
        table: &str,
        all_columns: &[String],
    ) -> Result<Vec<PartitionDescriptor>, EngineError> {
        let partition_hint = self
            .partition_count()
            .map_err(|source| EngineError::Planning {
                table: table.to_string(),
                source,
            })?;

        let query = RecordQuery {
            tenant_id,
            table: table.to_string(),
            partition_hint,
            columns: self.query_columns(all_columns),
            from_ms: i64::MIN,
            to_ms: i64::MAX,
            offset: 0,
            limit: None,
        };

        let response = self
            .store
            .list_record_groups(&query)
            .map_err(|source| EngineError::Planning {
                table: table.to_string(),
                source,
            })?;

        let partitions: Vec<PartitionDescriptor> = response
            .groups
            .into_iter()
            .enumerate()
            .map(|(index, record_group)| PartitionDescriptor {
                store_name: response.store_name.clone(),
                record_group,
                index,
            })
            .collect();

        tracing::info!(
            tenant = tenant_id,
            table = %table,
            store = %response.store_name,
            requested = partition_hint,
            partitions = partitions.len(),
            "planned partitions"
        );
        Ok(partitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use rowsplit_api::storage::{FixedHint, RecordGroups, RecordIter};

    /// Records the last query and answers with fixed groups.
    struct ScriptedStore {
        groups: Result<Vec<RecordGroup>, StoreError>,
        last_query: Mutex<Option<RecordQuery>>,
    }

    impl ScriptedStore {
        fn with_groups(ids: &[&str]) -> Self {
            Self {
                groups: Ok(ids
                    .iter()
                    .map(|id| RecordGroup::new(*id, serde_json::Value::Null))
                    .collect()),
                last_query: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                groups: Err(StoreError::data_access("store unreachable")),
                last_query: Mutex::new(None),
            }
        }

        fn last_query(&self) -> RecordQuery {
            self.last_query.lock().unwrap().clone().unwrap()
        }
    }

    impl RecordStore for ScriptedStore {
        fn list_record_groups(&self, query: &RecordQuery) -> Result<RecordGroups, StoreError> {
            *self.last_query.lock().unwrap() = Some(query.clone());
            self.groups.clone().map(|groups| RecordGroups {
                store_name: "scripted".into(),
                groups,
            })
        }

        fn read_records(&self, _: &str, _: &RecordGroup) -> Result<RecordIter, StoreError> {
            Ok(Box::new(std::iter::empty()))
        }

        fn locations_of(&self, _: &RecordGroup) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct BrokenHint;

    impl PartitionHint for BrokenHint {
        fn num_partitions_hint(&self) -> Result<usize, StoreError> {
            Err(StoreError::data_access("executor gone"))
        }
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn zero_hint_requests_one_partition() {
        let store = Arc::new(ScriptedStore::with_groups(&["g0"]));
        let planner = PartitionPlanner::new(store.clone()).with_hint(Arc::new(FixedHint(0)));
        assert_eq!(planner.partition_count().unwrap(), 1);
        planner.plan(1, "T", &cols(&["a"])).unwrap();
        assert_eq!(store.last_query().partition_hint, 1);
    }

    #[test]
    fn one_partition_per_group_in_order() {
        let store = Arc::new(ScriptedStore::with_groups(&["g0", "g1", "g2"]));
        let planner = PartitionPlanner::new(store.clone());
        let parts = planner.plan(-1234, "EVENTS", &cols(&["a"])).unwrap();

        assert_eq!(parts.len(), 3);
        for (i, p) in parts.iter().enumerate() {
            assert_eq!(p.index, i);
            assert_eq!(p.store_name, "scripted");
            assert_eq!(p.record_group.id, format!("g{i}"));
        }
    }

    #[test]
    fn full_range_query_with_data_column() {
        let store = Arc::new(ScriptedStore::with_groups(&[]));
        let planner = PartitionPlanner::new(store.clone());
        planner.plan(7, "T", &cols(&["a", "b"])).unwrap();

        let q = store.last_query();
        assert_eq!(q.tenant_id, 7);
        assert_eq!(q.table, "T");
        assert_eq!(q.columns, cols(&["a", "b", DATA_COLUMN]));
        assert_eq!(q.from_ms, i64::MIN);
        assert_eq!(q.to_ms, i64::MAX);
        assert_eq!(q.offset, 0);
        assert_eq!(q.limit, None);
        assert_eq!(q.partition_hint, DEFAULT_PARTITION_COUNT);
    }

    #[test]
    fn data_column_not_duplicated() {
        let planner = PartitionPlanner::new(Arc::new(ScriptedStore::with_groups(&[])));
        let columns = planner.query_columns(&cols(&[DATA_COLUMN, "x"]));
        assert_eq!(columns, cols(&[DATA_COLUMN, "x"]));
    }

    #[test]
    fn hint_service_drives_partition_count() {
        let store = Arc::new(ScriptedStore::with_groups(&["g"]));
        let planner = PartitionPlanner::new(store.clone()).with_hint(Arc::new(FixedHint(16)));
        planner.plan(1, "T", &cols(&["a"])).unwrap();
        assert_eq!(store.last_query().partition_hint, 16);
    }

    #[test]
    fn default_partitions_override() {
        let store = Arc::new(ScriptedStore::with_groups(&["g"]));
        let planner = PartitionPlanner::new(store.clone()).with_default_partitions(0);
        assert_eq!(planner.partition_count().unwrap(), 1);
    }

    #[test]
    fn store_failure_is_fatal() {
        let planner = PartitionPlanner::new(Arc::new(ScriptedStore::failing()));
        let err = planner.plan(1, "T", &cols(&["a"])).unwrap_err();
        match err {
            EngineError::Planning { table, source } => {
                assert_eq!(table, "T");
                assert_eq!(source.message, "store unreachable");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn hint_failure_is_fatal() {
        let planner = PartitionPlanner::new(Arc::new(ScriptedStore::with_groups(&["g"])))
            .with_hint(Arc::new(BrokenHint));
        let err = planner.plan(1, "T", &cols(&["a"])).unwrap_err();
        assert!(matches!(err, EngineError::Planning { ref table, .. } if table == "T"));
        assert!(err.to_string().contains("partition hint"));
    }
}
