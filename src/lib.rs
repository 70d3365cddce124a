//! Tubely Ingest Library
//!
//! Media-asset ingestion for a video hosting service: thumbnail and video
//! uploads are validated, placed in storage and recorded on the owning video.
//!
//! # Features
//!
//! - **Thumbnails**: stored on local disk or inlined as `data:` URLs
//! - **Videos**: probed with `ffprobe`, filed by aspect ratio, uploaded to S3
//! - **Auth**: HS256 JWT bearer tokens, ownership checked before any write
//!
//! # Example
//!
//! ```no_run
//! use tubely_ingest::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = Server::from_config(&config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod media;
pub mod metrics;
pub mod probe;
pub mod router;
pub mod s3;
pub mod server;
pub mod storage;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
