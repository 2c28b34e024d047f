//! enrich - batch enrichment of product records
//!
//! Runs one extract, enrich and load pass and exits.

use anyhow::Context;
use clap::Parser;
use enrichment_rs::config::StorageBackend;
use enrichment_rs::utils::{LogFormat, init_logging};
use enrichment_rs::{EnrichmentError, Pipeline, PipelineConfig, RunOptions, RunReport};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "enrich", version, about = "Classify and review new product records")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "ENRICH_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use a local directory as object storage instead of the storage API
    #[arg(long, value_name = "DIR")]
    local_store: Option<PathBuf>,

    /// Move fully processed source files to the processed prefix
    #[arg(long)]
    cleanup: bool,

    /// Upload per-shop, per-user and per-date KPI tables
    #[arg(long)]
    analytics: bool,

    /// Only enrich the first N batches
    #[arg(long, value_name = "N")]
    max_batches: Option<usize>,

    /// Log output format (text or json)
    #[arg(long, default_value = "text", env = "ENRICH_LOG_FORMAT")]
    log_format: LogFormat,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info", env = "ENRICH_LOG_LEVEL")]
    log_level: String,
}

async fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::load_unvalidated(cli.config.as_deref())
        .await
        .context("failed to load configuration")?;

    if let Some(dir) = &cli.local_store {
        config.storage.backend = StorageBackend::Local;
        config.storage.local_root = Some(dir.to_string_lossy().into_owned());
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<RunReport> {
    let config = load_config(&cli).await?;
    info!(
        model = %config.completion.model,
        batch_size = config.enrichment.batch_size,
        concurrency = config.enrichment.concurrency,
        "Configuration loaded"
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling outstanding batches");
            signal_token.cancel();
        }
    });

    let pipeline = Pipeline::from_config(config)?.with_cancellation(cancel);
    let options = RunOptions {
        cleanup: cli.cleanup,
        max_batches: cli.max_batches,
        analytics: cli.analytics,
    };

    Ok(pipeline.run(options).await?)
}

/// Exit status for a failed run: 2 when nothing was started, 1 otherwise
fn failure_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<EnrichmentError>() {
        Some(e) if e.is_fatal_at_startup() => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level);

    match run(cli).await {
        Ok(report) => {
            if !report.is_complete() {
                warn!(
                    lost_batches = report.batches_lost,
                    failed_chunks = report.chunks_failed,
                    failed_kpi_tables = report.kpi_tables_failed,
                    "Run finished with data loss"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(failure_code(&e))
        }
    }
}
