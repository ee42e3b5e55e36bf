use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use records_daemon::{
    batch::BatchProcessor,
    config::{ConfigLayer, DaemonConfig, StoreBackend},
    http,
    pool::WorkerPool,
    service::RecordService,
};
use records_storage::{InMemoryRecordStore, RecordStore};
use records_storage_sqlite::SqliteRecordStore;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "records-daemon", version, about = "Record store with bounded batch processing")]
struct Cli {
    /// Where the HTTP API will listen, e.g. 127.0.0.1:8080
    #[arg(long)]
    listen: Option<String>,

    /// Storage backend.
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,

    /// SQLite database file, used with `--store sqlite`.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Number of batch units allowed to run at once.
    #[arg(long)]
    pool_size: Option<usize>,

    /// Fixed per-record processing delay in milliseconds.
    #[arg(long)]
    unit_delay_ms: Option<u64>,

    /// Wall-clock budget for one batch run, in seconds.
    #[arg(long)]
    batch_deadline_secs: Option<u64>,

    /// TOML file with the same settings. Flags given here take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset, e.g. "info" or "records_daemon=debug".
    #[arg(long)]
    log: Option<String>,
}

impl Cli {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            listen: self.listen.clone(),
            store: self.store,
            db_path: self.db_path.clone(),
            pool_size: self.pool_size,
            unit_delay_ms: self.unit_delay_ms,
            batch_deadline_secs: self.batch_deadline_secs,
            log: self.log.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => ConfigLayer::load(path)?,
        None => ConfigLayer::default(),
    };
    let config = DaemonConfig::resolve(cli.layer().over(file)).context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log))
        .context("invalid log filter")?;
    fmt().with_target(false).with_env_filter(filter).init();

    info!("starting daemon with config: {:?}", config);

    let store: Arc<dyn RecordStore> = match config.store {
        StoreBackend::Memory => Arc::new(InMemoryRecordStore::new()),
        StoreBackend::Sqlite => Arc::new(SqliteRecordStore::open(&config.db_path)?),
    };

    let pool = WorkerPool::new(config.pool_size);
    let processor = Arc::new(BatchProcessor::new(
        Arc::clone(&store),
        pool,
        config.batch.clone(),
    ));
    let svc = Arc::new(RecordService::new(store, processor));

    let app = http::router(svc);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("bind {}", config.listen))?;
    info!("listening on http://{}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown requested");
}
