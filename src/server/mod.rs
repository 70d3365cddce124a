//! HTTP server module
//!
//! hyper HTTP/1.1 server. Each accepted connection runs in its own task and
//! every request shares one [`AppState`].
//!
//! # Example
//!
//! ```no_run
//! use tubely_ingest::{config::Config, server::Server};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.yaml")?;
//! let server = Server::from_config(&config).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod handlers;
pub mod http_tracing;

use crate::auth::jwt::JwtAuthenticator;
use crate::auth::Authenticator;
use crate::config::{Config, ThumbnailStrategyKind, UploadConfig};
use crate::db::InMemoryRecordStore;
use crate::probe::FfprobeProbe;
use crate::router::RequestParser;
use crate::s3::{S3Client, S3ClientConfig};
use crate::storage::local::url_prefix;
use crate::storage::{InlineAssetEncoder, LocalAssetStore, ThumbnailStrategy};
use crate::upload::{PipelineSettings, UploadKind, UploadPipeline};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Startup failed: {0}")]
    StartupError(String),
}

/// Per-kind request body limits
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_video_bytes: u64,
    pub max_thumbnail_bytes: u64,
}

impl UploadLimits {
    pub fn for_kind(&self, kind: UploadKind) -> u64 {
        match kind {
            UploadKind::Thumbnail => self.max_thumbnail_bytes,
            UploadKind::Video => self.max_video_bytes,
        }
    }
}

impl From<&UploadConfig> for UploadLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_video_bytes: config.max_video_bytes,
            max_thumbnail_bytes: config.max_thumbnail_bytes,
        }
    }
}

/// State shared by all requests
pub struct AppState {
    pub pipeline: UploadPipeline,
    pub authenticator: Arc<dyn Authenticator>,
    pub router: RequestParser,
    pub assets_root: PathBuf,
    pub limits: UploadLimits,
}

impl AppState {
    /// Assets under `assets_root` are served at the URL prefix derived from
    /// the same path the disk strategy writes URLs with.
    pub fn new(
        pipeline: UploadPipeline,
        authenticator: Arc<dyn Authenticator>,
        assets_root: PathBuf,
        limits: UploadLimits,
    ) -> Self {
        Self {
            pipeline,
            authenticator,
            router: RequestParser::new(url_prefix(&assets_root)),
            assets_root,
            limits,
        }
    }

    /// Build production collaborators from configuration
    pub async fn from_config(config: &Config) -> Result<Self, ServerError> {
        let thumbnails = match config.assets.thumbnail_strategy {
            ThumbnailStrategyKind::Disk => {
                let base_url = format!(
                    "http://{}:{}",
                    config.server.public_host,
                    config.server.advertised_port()
                );
                let store = LocalAssetStore::new(&config.assets.root, base_url);
                store
                    .ensure_root()
                    .await
                    .map_err(|e| ServerError::StartupError(e.to_string()))?;
                ThumbnailStrategy::Disk(store)
            }
            ThumbnailStrategyKind::Inline => ThumbnailStrategy::Inline(InlineAssetEncoder),
        };

        let objects = S3Client::new(S3ClientConfig::from(&config.s3))
            .await
            .map_err(|e| ServerError::StartupError(e.to_string()))?;

        let records = match config.records.seed_file {
            Some(ref path) => InMemoryRecordStore::from_seed_file(path)
                .await
                .map_err(|e| ServerError::StartupError(e.to_string()))?,
            None => InMemoryRecordStore::new(),
        };

        let pipeline = UploadPipeline::new(
            Arc::new(records),
            Arc::new(objects),
            Arc::new(FfprobeProbe::new(config.probe.ffprobe_path.clone())),
            thumbnails,
            PipelineSettings {
                bucket: config.s3.bucket.clone(),
                region: config.s3.region.clone(),
                temp_dir: config.upload.temp_dir(),
            },
        );

        info!(
            thumbnail_strategy = pipeline.thumbnail_strategy().name(),
            bucket = %config.s3.bucket,
            region = %config.s3.region,
            "Upload pipeline ready"
        );

        let mut authenticator = JwtAuthenticator::new_hs256(&config.auth.jwt_secret);
        if let Some(ref issuer) = config.auth.issuer {
            authenticator = authenticator.with_issuer(issuer);
        }

        Ok(Self::new(
            pipeline,
            Arc::new(authenticator),
            config.assets.root.clone(),
            UploadLimits::from(&config.upload),
        ))
    }
}

/// HTTP Server
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind immediately. Port 0 lets the OS pick a port.
    pub async fn bind(address: &str, state: Arc<AppState>) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!("Server bound to {}", local_addr);

        Ok(Self {
            state,
            listener,
            local_addr,
        })
    }

    /// Build state from configuration and bind to `server.address`
    pub async fn from_config(config: &Config) -> Result<Self, ServerError> {
        let state = AppState::from_config(config).await?;
        Self::bind(&config.server.address, Arc::new(state)).await
    }

    /// Get the local address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves. In-flight connections keep running
    /// on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Starting server on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);

                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handlers::handle_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }

        info!("Shutting down server");
        Ok(())
    }
}
