use rowsplit_api::error::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Partition discovery failed; the run cannot start.
    #[error("planning table '{table}': {source}")]
    Planning { table: String, source: StoreError },

    /// The store failed while starting or streaming a partition.
    #[error("reading partition {partition}: {source}")]
    PartitionRead { partition: usize, source: StoreError },

    #[error("malformed event document: {reason}")]
    MalformedDocument {
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("partition {partition} cancelled")]
    Cancelled { partition: usize },

    #[error("config error: {0}")]
    Config(String),

    /// A worker task panicked or was aborted.
    #[error("worker failed: {0}")]
    Worker(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        EngineError::MalformedDocument { reason: reason.into(), source: None }
    }

    /// Add context to the error.
    ///
    /// For store-backed variants, context is added to the inner `StoreError`.
    /// For message variants, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Planning { table, source } => EngineError::Planning {
                table,
                source: source.with_context(ctx),
            },
            EngineError::PartitionRead { partition, source } => EngineError::PartitionRead {
                partition,
                source: source.with_context(ctx),
            },
            EngineError::MalformedDocument { reason, source } => EngineError::MalformedDocument {
                reason: format!("{ctx}: {reason}"),
                source,
            },
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::MalformedDocument { reason: e.to_string(), source: Some(e) }
    }
}
