//! Tubely Ingest - thumbnail and video upload service

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tubely_ingest::{config::Config, metrics::server::MetricsServer, server::Server};

/// Tubely Ingest - upload, classify and store video assets
#[derive(Parser, Debug)]
#[command(name = "tubely-ingest")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error). RUST_LOG overrides it.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(args.log_level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Tubely Ingest v{}", tubely_ingest::VERSION);

    let config = Config::load(&args.config)?;
    info!("Loaded configuration from {:?}", args.config);

    let mut metrics_server = None;
    if config.metrics.enabled {
        let mut server = MetricsServer::new(format!("0.0.0.0:{}", config.metrics.port));
        server.start().await?;
        metrics_server = Some(server);
    }

    let server = Server::from_config(&config).await?;
    server.run().await?;

    if let Some(mut server) = metrics_server {
        server.shutdown().await;
    }

    Ok(())
}
