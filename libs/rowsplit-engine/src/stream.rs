use rowsplit_api::error::StoreError;
use rowsplit_api::record::RawRecord;
use rowsplit_api::value::Row;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::expand::EventExpander;

/// Flattens a raw-record sequence into rows, one record at a time.
///
/// Holds at most one record's expansion. Records expanding to zero rows are
/// skipped. The cancellation token is checked before every record pull, never
/// in the middle of a record's rows.
///
/// Single pass: the first error ends the stream, and exhausting it exhausts
/// the underlying records.
pub struct RowStream<I> {
    records: I,
    expander: EventExpander,
    buffer: std::vec::IntoIter<Row>,
    cancel: CancellationToken,
    partition: usize,
    records_read: u64,
    rows_emitted: u64,
    finished: bool,
}

impl<I> RowStream<I>
where
    I: Iterator<Item = Result<RawRecord, StoreError>>,
{
    pub fn new(records: I, expander: EventExpander) -> Self {
        Self {
            records,
            expander,
            buffer: Vec::new().into_iter(),
            cancel: CancellationToken::new(),
            partition: 0,
            records_read: 0,
            rows_emitted: 0,
            finished: false,
        }
    }

    /// Honor `token` between record pulls.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Partition index reported in errors.
    pub fn for_partition(mut self, partition: usize) -> Self {
        self.partition = partition;
        self
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }

    fn fail(&mut self, err: EngineError) -> Option<Result<Row, EngineError>> {
        self.finished = true;
        self.buffer = Vec::new().into_iter();
        Some(Err(err))
    }
}

impl<I> Iterator for RowStream<I>
where
    I: Iterator<Item = Result<RawRecord, StoreError>>,
{
    type Item = Result<Row, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            if let Some(row) = self.buffer.next() {
                self.rows_emitted += 1;
                return Some(Ok(row));
            }

            // Buffer drained: the only point where the store is pulled.
            if self.cancel.is_cancelled() {
                let partition = self.partition;
                return self.fail(EngineError::Cancelled { partition });
            }

            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(source)) => {
                    let partition = self.partition;
                    return self.fail(EngineError::PartitionRead { partition, source });
                }
                None => {
                    self.finished = true;
                    return None;
                }
            };
            self.records_read += 1;

            match self.expander.expand(&record) {
                Ok(rows) => self.buffer = rows.into_iter(),
                Err(e) => {
                    let ctx = format!("partition {} record {}", self.partition, self.records_read);
                    return self.fail(e.with_context(ctx));
                }
            }
        }
    }
}

impl<I> std::iter::FusedIterator for RowStream<I> where
    I: Iterator<Item = Result<RawRecord, StoreError>>
{
}
