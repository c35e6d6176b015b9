use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tubeq::{QueueRegistry, RespConfig, RespServer};

/// In-memory named FIFO message queues over RESP
#[derive(Parser, Debug)]
#[command(name = "tubeq", version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "TUBEQ_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "TUBEQ_PORT", default_value_t = 6379)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tubeq=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = RespConfig {
        host: cli.host,
        port: cli.port,
    };

    let registry = Arc::new(QueueRegistry::new());
    let shutdown = CancellationToken::new();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            tracing::info!("Received Ctrl+C, shutting down");
            shutdown.cancel();
        });
    }

    let server = RespServer::new(config, registry);
    server.run(shutdown).await?;

    Ok(())
}
