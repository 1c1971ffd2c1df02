use std::sync::Arc;

use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rowsplit_api::storage::{FixedHint, RecordStore};
use rowsplit_api::value::Row;
use rowsplit_engine::config::RunConfig;
use rowsplit_engine::executor::{Job, LocalExecutor};
use rowsplit_engine::extension::ExtensionConfigs;
use rowsplit_engine::{EventExpander, PartitionCompute, PartitionPlanner};
use rowsplit_storage_file::{FileStore, FileStoreConfig};

#[derive(Parser)]
#[command(name = "rowsplit", about = "Expand aggregated event records into flat rows")]
struct Cli {
    /// Path to TOML run configuration.
    #[arg(long, default_value = "rowsplit.toml", env = "ROWSPLIT_CONFIG")]
    config: String,

    /// Rows buffered between partition workers and the output writer.
    #[arg(long, default_value_t = 1024)]
    buffer: usize,
}

#[tokio::main]
async fn main() {
    // Rows go to stdout; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::info!(config = %cli.config, "loading configuration");
    let config = match RunConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let mut store_config = FileStoreConfig {
        name: config.store.name.clone(),
        data_dir: config.store.data_dir.clone(),
        locations: config.store.locations.clone(),
    };
    // `[[extensions]]` entries under the "store" namespace override the store section.
    let extensions = ExtensionConfigs::new(config.extensions.clone());
    if let Some(props) = extensions.reader("store", &store_config.name) {
        if let Some(dir) = props.get_str("data_dir") {
            tracing::info!(store = %store_config.name, data_dir = dir, "store data_dir overridden by extension");
            store_config.data_dir = dir.into();
        }
    }
    let store: Arc<dyn RecordStore> = Arc::new(FileStore::new(store_config));

    let mut planner = PartitionPlanner::new(store.clone())
        .with_default_partitions(config.default_partitions)
        .with_data_column(config.data_column.clone());
    if let Some(hint) = config.partitions_hint {
        planner = planner.with_hint(Arc::new(FixedHint(hint)));
    }

    let expander = EventExpander::with_data_column(&config.columns, &config.data_column);
    let compute = PartitionCompute::new(store, expander);

    let cancel = CancellationToken::new();
    let mut executor = LocalExecutor::new(cancel.clone());
    if let Some(n) = config.max_parallel {
        executor = executor.with_max_parallel(n);
    }

    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling run");
            ctrl_c_token.cancel();
        }
    });

    let (tx, rx) = mpsc::channel::<Row>(cli.buffer.max(1));
    let writer = tokio::spawn(write_rows(rx));

    let job = Job {
        tenant_id: config.tenant_id,
        table: config.table.clone(),
        all_columns: config.columns.clone(),
    };

    tracing::info!(
        tenant = config.tenant_id,
        table = %config.table,
        columns = config.columns.len(),
        "starting run"
    );
    let result = executor.run(Arc::new(planner), compute, job, tx).await;

    let written = match writer.await {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed writing rows");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "row writer task failed");
            std::process::exit(1);
        }
    };

    match result {
        Ok(summary) => {
            tracing::info!(partitions = summary.partitions, rows = summary.rows, written, "done");
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            std::process::exit(1);
        }
    }
}

/// Drain the row channel to stdout, one JSON array per line.
async fn write_rows(mut rx: mpsc::Receiver<Row>) -> std::io::Result<u64> {
    let mut out = tokio::io::BufWriter::new(tokio::io::stdout());
    let mut written = 0u64;
    while let Some(row) = rx.recv().await {
        let mut line = serde_json::to_vec(&row).map_err(std::io::Error::other)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        written += 1;
    }
    out.flush().await?;
    Ok(written)
}
