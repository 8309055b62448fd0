use std::sync::Arc;

use clap::Parser;
use encuesta_core::{EncuestaConfig, MemoryStore, ResponseStore};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use encuesta_server::http;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "encuesta.toml")]
    config: String,

    /// Keep responses in process memory instead of the hosted table
    #[arg(long)]
    memory: bool,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match EncuestaConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over service.log_level
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .init();

    let store: Arc<dyn ResponseStore> = if args.memory {
        tracing::warn!("Using in-memory response store; responses are lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        match encuesta_core::create_store(&config) {
            Ok(s) => Arc::from(s),
            Err(e) => {
                eprintln!("Failed to configure response store: {}", e);
                eprintln!("Set ENCUESTA__BACKEND__URL and ENCUESTA__BACKEND__ANON_KEY, or pass --memory");
                std::process::exit(1);
            }
        }
    };

    if args.health {
        let (status, body) = http::health_inner(store.as_ref()).await;
        if status.is_success() {
            println!("✅ {} backend reachable: {} responses", store.name(), body["responses"]);
            return Ok(());
        }
        println!("❌ {} backend unreachable", store.name());
        std::process::exit(1);
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

    http::start_http_server(store, config, tx.subscribe()).await?;

    Ok(())
}
