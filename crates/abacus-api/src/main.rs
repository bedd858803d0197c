use abacus_api::config::AbacusConfig;
use abacus_api::tracing_setup::{LogFormat, init_tracing};
use abacus_api::{AppState, create_app};
use abacus_core::{CalculationService, MemoryStore, OperationCosts};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Distributed arithmetic calculator
#[derive(Parser)]
#[command(name = "abacus")]
#[command(about = "Evaluates arithmetic expressions on a pool of workers with simulated operator costs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file (defaults to $ABACUS_CONFIG_PATH or abacus.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve,

    /// Evaluate expressions through the worker pool and print the results
    Eval {
        #[arg(required = true)]
        expressions: Vec<String>,

        /// Ignore configured operator costs
        #[arg(long)]
        no_delay: bool,
    },

    /// Validate and print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let path = AbacusConfig::resolve_path(cli.config.as_deref());
    let config = AbacusConfig::load(&path)?.apply_env_overrides();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Eval { expressions, no_delay } => eval(config, expressions, no_delay).await,
        Command::CheckConfig => check_config(&config, &path),
    }
}

fn check_config(config: &AbacusConfig, path: &Path) -> Result<()> {
    config.validate().map_err(|e| anyhow!("{}: {e}", path.display()))?;
    println!("# effective configuration ({})", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn eval(config: AbacusConfig, expressions: Vec<String>, no_delay: bool) -> Result<()> {
    let mut service_config = config.service_config()?;
    if no_delay {
        service_config.costs = OperationCosts::default();
    }

    let lines = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
        let store = Arc::new(MemoryStore::new());
        let service = CalculationService::start(service_config, store.clone())?;

        let submitted = expressions
            .iter()
            .map(|text| service.submit(text))
            .collect::<Result<Vec<_>, _>>()?;
        service.shutdown();

        Ok(submitted
            .iter()
            .filter_map(|expr| expr.id.and_then(|id| store.get(id)))
            .map(|expr| match (expr.result(), expr.error_message()) {
                (Some(value), _) => format!("{} = {value}", expr.text),
                (None, Some(message)) => format!("{}: error: {message}", expr.text),
                (None, None) => format!("{}: {}", expr.text, expr.status()),
            })
            .collect())
    })
    .await??;

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

async fn serve(config: AbacusConfig) -> Result<()> {
    let snapshot_path = config.store.snapshot_path.clone();
    let store = Arc::new(match &snapshot_path {
        Some(path) if path.exists() => MemoryStore::load_snapshot(path)?,
        _ => MemoryStore::new(),
    });

    let state = Arc::new(AppState::new(&config, store.clone())?);

    let unfinished = store.unfinished();
    if !unfinished.is_empty() {
        let service = state.service.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = service.resume(unfinished) {
                warn!(error = %e, "Resuming unfinished expressions stopped early");
            }
        });
    }

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Abacus server listening");

    axum::serve(listener, create_app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining workers");
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || service.shutdown()).await?;

    if let Some(path) = snapshot_path {
        store.save_snapshot(&path)?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
