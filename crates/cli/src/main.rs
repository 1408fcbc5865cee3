//! jobsieve - fetch job postings, filter and dedup them, and reconcile them
//! into one master file

mod logging;
mod output;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use jobsieve_core::application::{
    DuplicateDetector, FetchOrchestrator, Pacer, Reconciler, ReconcilerDeps, RunMode,
    SearchPipeline,
};
use jobsieve_core::port::id_provider::UuidProvider;
use jobsieve_core::port::time_provider::SystemTimeProvider;
use jobsieve_core::port::{IdProvider, SourceAdapter, TimeProvider};
use jobsieve_infra_fs::{
    BincodeScrapeCache, CsvMasterStore, JsonBlockListStore, JsonDuplicateRegistryStore,
};
use jobsieve_infra_http::JsonFeedSource;
use settings::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "jobsieve")]
#[command(about = "Job posting scrape reconciliation and dedup", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/jobsieve/settings.yaml)
    #[arg(long, env = "JOBSIEVE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Reconcile today's cached scrape instead of fetching
    #[arg(long, visible_alias = "no-scrape", conflicts_with = "recover")]
    no_fetch: bool,

    /// Rebuild the master file from every cached scrape
    #[arg(long)]
    recover: bool,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn mode(&self) -> RunMode {
        if self.recover {
            RunMode::Recover
        } else if self.no_fetch {
            RunMode::NoFetch
        } else {
            RunMode::Normal
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mode = cli.mode();

    // 1. Settings, then logging (the log file location comes from settings)
    let settings = Settings::load(cli.settings.as_deref())?;
    let level = cli.log_level.as_deref().or(settings.log_level.as_deref());
    let _log_guard = logging::init(level, settings.paths.log_file.as_deref())?;

    info!(version = VERSION, mode = %mode, "jobsieve starting");

    // 2. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);

    let Settings {
        paths,
        search,
        filter,
        dedup,
        max_fetch_workers,
        sources: source_configs,
        ..
    } = settings;

    let sources = if mode == RunMode::Normal {
        let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(source_configs.len());
        for config in source_configs {
            let provider = config.provider.clone();
            let source = JsonFeedSource::new(config, time_provider.clone())
                .with_context(|| format!("Invalid source definition '{provider}'"))?;
            sources.push(Arc::new(source));
        }
        if sources.is_empty() {
            warn!("No sources configured; nothing will be fetched");
        }
        sources
    } else {
        Vec::new()
    };

    let reconciler = Reconciler::new(
        ReconcilerDeps {
            master_store: Arc::new(CsvMasterStore::new(&paths.master_file)),
            block_list_store: Arc::new(JsonBlockListStore::new(&paths.block_list_file)),
            registry_store: Arc::new(JsonDuplicateRegistryStore::new(&paths.registry_file)),
            time_provider: time_provider.clone(),
        },
        filter,
        DuplicateDetector::new(dedup),
        search.locale,
    );

    let orchestrator = FetchOrchestrator::new(Arc::new(Pacer::new()), time_provider.clone())
        .with_max_workers(max_fetch_workers);

    let pipeline = SearchPipeline::new(
        sources,
        orchestrator,
        Arc::new(BincodeScrapeCache::new(&paths.cache_folder)),
        reconciler,
        search,
        id_provider,
        time_provider,
    );

    // 3. Run
    let summary = pipeline
        .run(mode)
        .await
        .with_context(|| format!("{mode} run failed"))?;

    info!(
        run_id = %summary.run_id,
        master = summary.reconcile.master_size,
        "jobsieve finished"
    );
    output::print_summary(&summary);

    Ok(())
}
