use aggregator::cache::SnapshotCache;
use aggregator::engine::Aggregator;
use aggregator::spatial::CellIndexer;
use aggregator::store::SqliteStore;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser)]
#[command(about = "Radio coverage aggregation service")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::Config::from_file(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // The guard flushes pending events on drop; keep it for the process
    // lifetime.
    let _sentry_guard = config.common.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    if let Some(metrics_config) = &config.common.metrics {
        install_statsd_recorder(metrics_config)?;
    }
    shared::metrics_defs::describe_all(aggregator::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_all(gateway::metrics_defs::ALL_METRICS);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteStore::open(&config.aggregator.database.path)?);
    let indexer = CellIndexer::new(config.aggregator.cell_resolution)?;
    let cache = SnapshotCache::new(config.aggregator.cache_capacity);
    let aggregator = Arc::new(Aggregator::new(
        indexer,
        cache,
        store,
        config.aggregator.ingest_concurrency,
    ));

    tracing::info!(
        database = %config.aggregator.database.path,
        cell_resolution = config.aggregator.cell_resolution,
        "starting radiomap"
    );
    gateway::run(config.gateway, aggregator).await?;

    Ok(())
}

fn install_statsd_recorder(
    config: &config::MetricsConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let recorder = metrics_exporter_statsd::StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .with_queue_size(5000)
        .with_buffer_size(1024)
        .build(Some("radiomap"))?;
    metrics::set_global_recorder(recorder)
        .map_err(|e| format!("failed to install statsd recorder: {e}"))?;

    Ok(())
}
