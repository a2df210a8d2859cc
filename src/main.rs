#![forbid(unsafe_code)]

//! `questlog` — gamified task manager daemon.
//!
//! Bootstraps configuration, opens the task store, starts the source
//! pollers, and serves the HTTP review surface.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use questlog::config::GlobalConfig;
use questlog::extract::model::HttpCompletionBackend;
use questlog::extract::{CompletionBackend, ExtractionEngine, RelevanceFilter};
use questlog::http::{self, AppState};
use questlog::ingest::IngestPipeline;
use questlog::persistence::db;
use questlog::persistence::draft_repo::DraftRepo;
use questlog::persistence::integration_repo::IntegrationRepo;
use questlog::persistence::progress_repo::ProgressRepo;
use questlog::persistence::task_repo::TaskRepo;
use questlog::review::ReviewService;
use questlog::scheduler::{spawn_pollers, Scanner};
use questlog::sources::bot::BotConnector;
use questlog::sources::chat::ChatConnector;
use questlog::sources::email::EmailConnector;
use questlog::sources::SourceConnector;
use questlog::tasks::TaskService;
use questlog::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "questlog", about = "Gamified task manager daemon", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("questlog daemon bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Open the task store ─────────────────────────────
    let db_path = config.db_path().to_string_lossy().to_string();
    let db = Arc::new(db::connect(&db_path).await?);
    info!("database connected");

    let tasks = TaskRepo::new(Arc::clone(&db));
    let drafts = DraftRepo::new(Arc::clone(&db));
    let integrations = IntegrationRepo::new(Arc::clone(&db));
    let progress = ProgressRepo::new(Arc::clone(&db));

    // ── Build the extraction stack ──────────────────────
    let backend: Arc<dyn CompletionBackend> = Arc::new(HttpCompletionBackend::new(&config.model)?);
    let engine = ExtractionEngine::new(Arc::clone(&backend));
    let filter = RelevanceFilter::new(backend);

    // ── Register source connectors ──────────────────────
    let mut connectors: Vec<Arc<dyn SourceConnector>> = Vec::new();
    if let Some(ref email_api_base) = config.sources.email_api_base {
        connectors.push(Arc::new(EmailConnector::new(email_api_base.clone())?));
        info!("email connector registered");
    }
    if config.slack.bot_user_id.is_empty() {
        info!("slack not configured; chat-mention connector disabled");
    } else {
        connectors.push(Arc::new(ChatConnector::new(
            config.slack.bot_user_id.clone(),
        )?));
        info!("chat-mention connector registered");
    }
    connectors.push(Arc::new(BotConnector::new(
        config.sources.bot_api_base.clone(),
    )?));
    info!("bot connector registered");

    // ── Assemble pipeline and services ──────────────────
    let pipeline = Arc::new(IngestPipeline::new(
        tasks.clone(),
        drafts.clone(),
        engine.clone(),
        filter,
    ));
    let scanner = Arc::new(Scanner::new(
        connectors,
        pipeline,
        integrations,
        config.scheduler.batch_max,
    ));
    let state = Arc::new(AppState {
        review: ReviewService::new(drafts.clone(), tasks.clone(), engine),
        tasks: TaskService::new(tasks, progress),
        drafts,
        scanner: Arc::clone(&scanner),
    });

    // ── Start pollers and the review surface ────────────
    let ct = CancellationToken::new();
    let poller_handles = spawn_pollers(
        &scanner,
        std::time::Duration::from_secs(config.scheduler.tick_seconds),
        &ct,
    );

    let http_ct = ct.clone();
    let http_state = Arc::clone(&state);
    let http_port = config.http_port;
    let http_handle = tokio::spawn(async move {
        if let Err(err) = http::serve(http_state, http_port, http_ct).await {
            error!(%err, "review surface failed");
        }
    });

    info!("questlog ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    for handle in poller_handles {
        let _ = handle.await;
    }
    let _ = http_handle.await;
    info!("questlog shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
