use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tgrelay_agent::{ChatGateway, MessageProcessor, PipelineSettings, ProcessError};
use tgrelay_completion::{CompletionClient, OpenAiCompletionClient};
use tgrelay_core::RelayConfig;
use tgrelay_telegram::TelegramGateway;
use tgrelay_transcript::{SqliteTranscript, TranscriptStore};

mod app;
mod http;

/// Relay between a Telegram bot and an OpenAI-compatible completion API.
#[derive(Parser, Debug)]
#[command(name = "tgrelay-gateway", version, about)]
struct Cli {
    /// Config file (default: ~/.tgrelay/tgrelay.toml).
    #[arg(long, env = "TGRELAY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RelayConfig::load(cli.config.as_deref())?;
    init_tracing(&config);

    let db_path = &config.database.path;
    config.database.ensure_parent_dir()?;
    info!(path = %db_path, "opening SQLite database");
    let transcript = Arc::new(SqliteTranscript::open(
        db_path,
        Duration::from_millis(config.database.busy_timeout_ms),
    )?);
    let store: Arc<dyn TranscriptStore> = transcript.clone();

    let client: Arc<dyn CompletionClient> =
        Arc::new(OpenAiCompletionClient::from_config(&config.completion));
    info!(
        client = client.name(),
        model = %config.completion.model,
        base_url = %config.completion.base_url,
        "completion client ready"
    );

    let gateway: Arc<dyn ChatGateway> = Arc::new(TelegramGateway::new(&config.telegram)?);

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone())?;

    let http_task = if config.http.enabled {
        let addr: SocketAddr = format!("{}:{}", config.http.bind, config.http.port).parse()?;
        let router = app::build_router(Arc::new(app::AppState::new(
            Arc::clone(&gateway),
            transcript,
        )));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("tgrelay HTTP listening on {}", addr);

        let shutdown = cancel.clone();
        Some(tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
            if let Err(e) = served {
                error!(error = %e, "HTTP server failed");
            }
        }))
    } else {
        None
    };

    let processor = MessageProcessor::new(
        gateway,
        store,
        client,
        PipelineSettings::from_config(&config),
    );

    let result: anyhow::Result<()> = match processor.run(cancel.clone()).await {
        Ok(()) => {
            warn!("update stream ended");
            Ok(())
        }
        Err(ProcessError::Cancelled) => Ok(()),
        Err(e) => Err(e.into()),
    };

    cancel.cancel();
    if let Some(task) = http_task {
        let _ = task.await;
    }
    info!("tgrelay stopped");
    result
}

/// Cancel `cancel` on ctrl-c or, on unix, SIGTERM.
fn spawn_shutdown_listener(cancel: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let sigterm = async move {
            terminate.recv().await;
        };
        #[cfg(not(unix))]
        let sigterm = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("ctrl-c received, shutting down"),
            _ = sigterm => info!("SIGTERM received, shutting down"),
        }
        cancel.cancel();
    }))
}

/// `RUST_LOG` wins; otherwise `log.level`, or `debug` in Telegram debug mode.
fn init_tracing(config: &RelayConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
