use std::sync::Arc;

use clap::Parser;
use minewatch_core::{ChatService, MessageLog, MessageStore, MinewatchConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use minewatch_server::fixtures::FixtureDir;
use minewatch_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "minewatch.toml")]
    config: String,

    /// Load the chat log, report what was recovered, and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match MinewatchConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Recovery runs here, before anything is served
    let store: Arc<dyn MessageStore> = Arc::new(MessageLog::from_config(&config.storage).await);

    if args.health {
        println!("✅ Chat log backend: {}", store.backend());
        println!("✅ Chat log path:    {}", config.storage.chat_path);
        println!("✅ Messages loaded:  {}", store.count().await);
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = Arc::new(HttpState {
        chat: ChatService::new(store),
        fixtures: FixtureDir::new(&config.fixtures.data_dir),
    });

    http::start_http_server(state, &config, tx.subscribe()).await?;

    Ok(())
}
