use anyhow::{Context, Result};
use chunkflow::cli::{Cli, Commands, ConfigAction};
use chunkflow::config::Config;
use chunkflow::pipeline::Pipeline;
use chunkflow::server::{self, AppState};
use chunkflow::storage::{AppendLog, IndexedStore};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    chunkflow::logging::init(cli.quiet, cli.verbose);

    match &cli.command {
        None | Some(Commands::Serve) => {
            let config = load_config(&cli)?;
            run_server(config).await?;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, &cli)?;
        }
    }

    Ok(())
}

/// Resolves the effective configuration: file, then environment, then flags.
///
/// An explicit `--config` must exist; the default location may be absent.
fn load_config(cli: &Cli) -> Result<Config> {
    let config = match (&cli.config, Config::default_path()) {
        (Some(path), _) => Config::load_required(path)?,
        (None, Some(default_path)) => Config::load_or_default(&default_path)?,
        (None, None) => Config::default(),
    };

    let config = cli.apply_overrides(config.with_env_overrides());
    config.validate()?;
    Ok(config)
}

fn handle_config_command(action: &ConfigAction, cli: &Cli) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(cli)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => match cli.config_path() {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("Could not determine config directory"),
        },
    }
    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    let log = AppendLog::open(&config.storage.log_path).with_context(|| {
        format!(
            "Failed to open append log at {}",
            config.storage.log_path.display()
        )
    })?;
    tracing::info!(path = %log.path().display(), "append log opened");

    let store = Arc::new(IndexedStore::new());
    let pipeline = Arc::new(Pipeline::new(
        config.pipeline_config(),
        store,
        Arc::new(log),
    ));
    pipeline.start()?;

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        version = %chunkflow::version_string(),
        "listening"
    );

    let app = server::router(
        AppState::new(pipeline.clone(), config.server.max_body_bytes),
        config.server.request_timeout(),
    );
    let served = server::serve(
        listener,
        app,
        shutdown_signal(),
        config.server.shutdown_grace(),
    )
    .await;

    // Joining worker threads blocks, keep it off the runtime threads
    let stopper = pipeline.clone();
    tokio::task::spawn_blocking(move || stopper.stop())
        .await
        .context("Pipeline shutdown task failed")?;

    served.context("Server error")?;
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("received SIGINT, shutting down");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for SIGINT");
        std::future::pending::<()>().await;
    }
    tracing::info!("received SIGINT, shutting down");
}
