//! Asset storage
//!
//! Thumbnail placement strategies and the shared byte-stream type the upload
//! pipeline hands to stores.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

pub mod inline;
pub mod keys;
pub mod local;

pub use inline::InlineAssetEncoder;
pub use keys::StorageKey;
pub use local::LocalAssetStore;

use crate::media::ClassifiedMedia;

/// Errors raised while reading an inbound upload body
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("Payload exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Failed to read upload body: {0}")]
    Read(String),
}

/// Streamed upload payload
pub type BodyStream<'a> = Pin<Box<dyn Stream<Item = Result<Bytes, BodyError>> + Send + 'a>>;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Body(#[from] BodyError),
}

/// Where thumbnails go. Chosen once from configuration.
#[derive(Debug, Clone)]
pub enum ThumbnailStrategy {
    /// Write under the served assets root
    Disk(LocalAssetStore),
    /// Embed as a `data:` URL in the record
    Inline(InlineAssetEncoder),
}

impl ThumbnailStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ThumbnailStrategy::Disk(_) => "disk",
            ThumbnailStrategy::Inline(_) => "inline",
        }
    }

    /// Store the thumbnail and return the URL to record
    pub async fn store(
        &self,
        body: BodyStream<'_>,
        media: &ClassifiedMedia,
    ) -> Result<String, StorageError> {
        match self {
            ThumbnailStrategy::Disk(store) => {
                let key = StorageKey::generate(None, media.extension());
                let stored = store.write(key.as_str(), body).await?;
                Ok(stored.url)
            }
            ThumbnailStrategy::Inline(encoder) => encoder.encode(body, media.media_type()).await,
        }
    }
}
