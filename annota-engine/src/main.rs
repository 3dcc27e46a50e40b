//! annota-engine - AI labeling orchestration CLI
//!
//! Runs sequential AI labeling over a record batch against a labeling
//! backend and streams session progress to the log.

use annota_common::config::{load_config, write_toml_config};
use annota_common::events::{AnnotaEvent, EventBus};
use annota_common::kv::MemoryKvStore;
use annota_common::SessionContext;
use annota_engine::orchestrator::spawn_refresh_ticker;
use annota_engine::services::{BackendClient, RecordRefresher};
use annota_engine::{ActiveJobPoller, EngineConfig, JobOrchestrator};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(name = "annota-engine", version, about = "AI labeling orchestration")]
struct Cli {
    /// Config file (overrides ANNOTA_CONFIG and the platform default)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dispatch one AI job per active taxonomy over the given records
    Run {
        /// Record ids, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        records: Vec<String>,

        /// Restrict the run to these taxonomy keys
        #[arg(long, value_delimiter = ',')]
        taxonomies: Vec<String>,
    },
    /// Poll tracked jobs until they settle (Ctrl-C to stop)
    Watch {
        /// Job ids to track
        #[arg(long, value_delimiter = ',')]
        jobs: Vec<String>,
    },
    /// Write the effective configuration to a TOML file
    WriteConfig {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = load_config(cli.config.as_deref())?;
    init_tracing(&toml_config.logging.level)?;

    info!("Starting annota-engine");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Command::WriteConfig { path } = &cli.command {
        write_toml_config(&toml_config, path)?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let config = EngineConfig::from_toml(&toml_config);
    let client = Arc::new(BackendClient::new(config.backend_url.as_str())?);
    info!("Backend: {}", client.base_url());

    let context = SessionContext::new(
        Arc::new(MemoryKvStore::new()),
        EventBus::new(config.event_bus_capacity),
    );
    info!("Session: {}", context.session_id());
    spawn_event_logger(&context);

    match cli.command {
        Command::Run {
            records,
            taxonomies,
        } => run(config, client, context, records, taxonomies).await,
        Command::Watch { jobs } => watch(config, client, context, jobs).await,
        Command::WriteConfig { .. } => Ok(()),
    }
}

fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(
    config: EngineConfig,
    client: Arc<BackendClient>,
    context: SessionContext,
    records: Vec<String>,
    taxonomies: Vec<String>,
) -> Result<()> {
    let refresher: Arc<dyn RecordRefresher> = Arc::new(context.clone());
    let orchestrator = Arc::new(JobOrchestrator::new(
        client.clone(),
        client,
        refresher,
        context,
        config.orchestrator,
    ));
    orchestrator.select_records(records);

    let cancel_on_signal = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing current taxonomy before stopping");
            cancel_on_signal.cancel();
        }
    });

    let report = if taxonomies.is_empty() {
        orchestrator.start().await?
    } else {
        orchestrator.start_for(&taxonomies).await?
    };

    for outcome in &report.outcomes {
        info!(
            taxonomy = %outcome.taxonomy_key,
            job_id = %outcome.job_id,
            outcome = %outcome.outcome.kind(),
            "Taxonomy finished"
        );
    }
    for timeout in report.timeouts() {
        warn!("{}", timeout);
    }
    if report.cancelled {
        warn!("Run cancelled");
    }

    match report.aborted {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

async fn watch(
    config: EngineConfig,
    client: Arc<BackendClient>,
    context: SessionContext,
    jobs: Vec<String>,
) -> Result<()> {
    let refresher: Arc<dyn RecordRefresher> = Arc::new(context.clone());
    let poller = ActiveJobPoller::new(
        client,
        Arc::clone(&refresher),
        context,
        config.active_job_poll_interval,
    );
    for job_id in &jobs {
        poller.track(job_id)?;
    }
    info!("Tracking {} job(s)", jobs.len());

    let shutdown = CancellationToken::new();
    let poller_handle = poller.spawn(shutdown.clone());
    let ticker_handle = spawn_refresh_ticker(refresher, config.refresh_interval, shutdown.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    shutdown.cancel();

    poller_handle.await?;
    ticker_handle.await?;
    Ok(())
}

/// Log every event of this session
fn spawn_event_logger(context: &SessionContext) {
    let mut subscription = context.subscribe();
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            match &event {
                AnnotaEvent::OrchestrationProgress { progress, .. } => info!(
                    current = %progress.current,
                    remaining = progress.remaining.len(),
                    percent = progress.percentage(),
                    "Progress"
                ),
                AnnotaEvent::OrchestrationFinished {
                    cancelled, error, ..
                } => info!(cancelled, error = ?error, "Run finished"),
                other => tracing::debug!(event = other.event_type(), "Session event"),
            }
        }
    });
}
