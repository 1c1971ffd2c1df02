use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use rowsplit_api::value::Row;

use crate::compute::PartitionCompute;
use crate::error::EngineError;
use crate::planner::{PartitionDescriptor, PartitionPlanner};

/// What to expand: one table of one tenant.
#[derive(Debug, Clone)]
pub struct Job {
    pub tenant_id: i64,
    pub table: String,
    pub all_columns: Vec<String>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub partitions: usize,
    pub rows: u64,
}

/// Runs a plan on the local tokio runtime: one blocking worker per partition.
///
/// Rows of a partition keep store order; rows of different partitions
/// interleave arbitrarily in the sink. The first partition failure cancels
/// the rest of the run and is returned; nothing is retried.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    cancel: CancellationToken,
    max_parallel: Option<usize>,
}

impl LocalExecutor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            max_parallel: None,
        }
    }

    pub fn with_max_parallel(mut self, n: usize) -> Self {
        self.max_parallel = Some(n.max(1));
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn run(
        &self,
        planner: Arc<PartitionPlanner>,
        compute: PartitionCompute,
        job: Job,
        sink: mpsc::Sender<Row>,
    ) -> Result<RunSummary, EngineError> {
        // --- 1. Plan (store I/O, off the async threads) ---
        let partitions = tokio::task::spawn_blocking(move || {
            planner.plan(job.tenant_id, &job.table, &job.all_columns)
        })
        .await
        .map_err(|e| EngineError::Worker(e.to_string()))??;

        let count = partitions.len();
        let permits = Arc::new(Semaphore::new(self.max_parallel.unwrap_or(count).max(1)));

        // --- 2. Spawn one worker per partition ---
        let mut workers = JoinSet::new();
        for partition in partitions {
            let permits = permits.clone();
            let compute = compute.clone();
            let sink = sink.clone();
            let cancel = self.cancel.clone();
            workers.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return Err(EngineError::Worker(e.to_string())),
                };
                let index = partition.index;
                match tokio::task::spawn_blocking(move || {
                    run_partition(&compute, &partition, cancel, &sink)
                })
                .await
                {
                    Ok(result) => result,
                    Err(e) => Err(EngineError::Worker(format!("partition {index}: {e}"))),
                }
            });
        }
        drop(sink);

        // --- 3. Collect; the first real failure wins over follow-up cancellations ---
        let mut rows = 0u64;
        let mut failure: Option<EngineError> = None;
        while let Some(joined) = workers.join_next().await {
            let result = joined.map_err(|e| EngineError::Worker(e.to_string())).and_then(|r| r);
            match result {
                Ok(n) => rows += n,
                Err(e) => {
                    self.cancel.cancel();
                    let replace = match &failure {
                        None => true,
                        Some(EngineError::Cancelled { .. }) => !matches!(e, EngineError::Cancelled { .. }),
                        Some(_) => false,
                    };
                    if replace {
                        tracing::warn!(error = %e, "partition failed, cancelling run");
                        failure = Some(e);
                    }
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        tracing::info!(partitions = count, rows, "run complete");
        Ok(RunSummary {
            partitions: count,
            rows,
        })
    }
}

/// Blocking body of one partition worker.
fn run_partition(
    compute: &PartitionCompute,
    partition: &PartitionDescriptor,
    cancel: CancellationToken,
    sink: &mpsc::Sender<Row>,
) -> Result<u64, EngineError> {
    let locations = compute.preferred_locations(partition);
    tracing::debug!(partition = partition.index, ?locations, "computing partition");

    let mut stream = compute.compute(partition, cancel)?;
    for row in stream.by_ref() {
        if sink.blocking_send(row?).is_err() {
            // Consumer went away; nothing left to produce for.
            return Err(EngineError::Cancelled {
                partition: partition.index,
            });
        }
    }

    tracing::debug!(
        partition = partition.index,
        records = stream.records_read(),
        rows = stream.rows_emitted(),
        "partition done"
    );
    Ok(stream.rows_emitted())
}
