use std::sync::Arc;

use rowsplit_api::storage::{RecordIter, RecordStore};
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::expand::EventExpander;
use crate::planner::PartitionDescriptor;
use crate::stream::RowStream;

/// Per-partition entry point called by the executing engine.
///
/// Shared read-only by every partition worker of a run.
#[derive(Clone)]
pub struct PartitionCompute {
    store: Arc<dyn RecordStore>,
    expander: EventExpander,
}

impl std::fmt::Debug for PartitionCompute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionCompute")
            .field("expander", &self.expander)
            .finish()
    }
}

impl PartitionCompute {
    pub fn new(store: Arc<dyn RecordStore>, expander: EventExpander) -> Self {
        Self { store, expander }
    }

    /// Open the partition's record group and wrap it in a lazy row stream.
    ///
    /// A store failure while opening is fatal for the partition; it is not
    /// retried here.
    pub fn compute(
        &self,
        partition: &PartitionDescriptor,
        cancel: CancellationToken,
    ) -> Result<RowStream<RecordIter>, EngineError> {
        let records = self
            .store
            .read_records(&partition.store_name, &partition.record_group)
            .map_err(|source| EngineError::PartitionRead {
                partition: partition.index,
                source: source.with_context(format!("group '{}'", partition.record_group.id)),
            })?;

        tracing::debug!(
            partition = partition.index,
            store = %partition.store_name,
            group = %partition.record_group.id,
            "opened partition"
        );

        Ok(RowStream::new(records, self.expander.clone())
            .with_cancellation(cancel)
            .for_partition(partition.index))
    }

    /// Placement hint for the scheduler.
    ///
    /// Lookup failures fall back to no preference.
    pub fn preferred_locations(&self, partition: &PartitionDescriptor) -> Vec<String> {
        match self.store.locations_of(&partition.record_group) {
            Ok(locations) => locations,
            Err(e) => {
                tracing::error!(
                    partition = partition.index,
                    group = %partition.record_group.id,
                    error = %e,
                    "error getting preferred locations, falling back to default placement"
                );
                Vec::new()
            }
        }
    }
}
