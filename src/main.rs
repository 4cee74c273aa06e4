use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kava::{
    avatar::{AvatarEngine, EngineOptions},
    config::Config,
    web::{WebServer, shutdown_signal},
};

#[derive(Parser)]
#[command(name = "kava")]
#[command(version)]
#[command(about = "Initials avatar service with an in-memory bounded image cache")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// TrueType/OpenType font file (overrides config file)
    #[arg(short, long, value_name = "PATH")]
    font: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("kava={},tower_http=trace", cli.log_level)
    } else {
        format!("kava={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting kava v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(font) = cli.font {
        config.avatar.font_path = Some(font);
    }

    let engine = Arc::new(AvatarEngine::new(EngineOptions::from(&config.avatar))?);
    engine.start_background_tasks();

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    let server = WebServer::new(config, Arc::clone(&engine));
    let result = server.serve_with_cancellation(cancel).await;

    engine.shutdown();
    info!("kava stopped");
    result
}
