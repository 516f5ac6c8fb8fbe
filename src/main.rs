//! Knuxhub
//!
//! Runs the broadcast hub: HTTP/WebSocket server, heartbeat ticker, chat
//! bridge and button bridge.

use anyhow::Context;
use clap::{Parser, Subcommand};
use knuxhub::config::{generate_default_config, Config, LoggingConfig};
use knuxhub::{
    serve, shutdown_signal, AppState, BroadcastHub, ButtonBridge, ChatBridge, TattooRenderer,
    Ticker,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "knuxhub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Broadcast hub for Knuk Tats")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the hub (default)
    Serve,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Config { output } => write_default_config(output),
        Commands::Serve => {
            let path = cli
                .config
                .or_else(|| Config::find(&Config::search_paths()));
            let config = match &path {
                Some(path) => Config::load_with_env(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => Config::from_env(),
            };

            init_logging(&config.logging);
            match &path {
                Some(path) => tracing::info!("Loaded config from {}", path.display()),
                None => tracing::info!("Using default config with environment overrides"),
            }
            run(config).await
        }
    }
}

fn write_default_config(output: Option<PathBuf>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("knuxhub={},tower_http=info", logging.level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Knuxhub v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();
    let tasks = TaskTracker::new();

    // Hub first; every source gets it injected
    let hub = Arc::new(BroadcastHub::new(config.hub.clone()));
    tracing::info!(
        prepared = config.hub.prepared,
        wire_format = ?config.hub.wire_format,
        "Broadcast hub ready"
    );

    if config.ticker.enabled {
        let ticker = Ticker::new(Arc::clone(&hub), &config.ticker);
        tasks.spawn(ticker.run(shutdown.clone()));
    }

    if config.chat.is_usable() {
        tracing::info!(
            host = %config.chat.host,
            port = config.chat.port,
            channel = %config.chat.channel,
            "Starting chat bridge"
        );
        let chat = ChatBridge::new(Arc::clone(&hub), config.chat.clone());
        tasks.spawn(chat.run(shutdown.clone()));
    } else {
        tracing::info!("Chat bridge disabled (set chat.nickname to enable)");
    }

    if config.button.enabled {
        let button = ButtonBridge::new(Arc::clone(&hub), config.button.clone());
        tasks.spawn(button.run(shutdown.clone()));
    }

    let mut state = AppState::new(Arc::clone(&hub), config.server.clone());
    match TattooRenderer::load(&config.tattoo) {
        Ok(renderer) => {
            state = state.with_tattoo(renderer, config.tattoo.default_text.clone());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Tattoo endpoint disabled");
        }
    }

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let result = serve(state, &config.server, shutdown.clone()).await;

    // Stop the sources whether the server exited cleanly or failed to start
    shutdown.cancel();
    tasks.close();
    tasks.wait().await;

    result.context("HTTP server failed")?;
    tracing::info!("Knuxhub stopped");
    Ok(())
}
