//! Local asset store
//!
//! Writes uploads under the served assets root. Files from earlier uploads of
//! the same video are left in place.

use super::{BodyStream, StorageError};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// URL path segment for an assets root directory
pub fn url_prefix(root: &Path) -> String {
    let root = root.to_string_lossy().replace('\\', "/");
    root.trim_start_matches("./").trim_matches('/').to_string()
}

/// Result of a local write
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub path: PathBuf,
    pub url: String,
    pub bytes_written: u64,
}

/// Store rooted at a served directory
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    base_url: String,
}

impl LocalAssetStore {
    /// `base_url` is the scheme, host and port the server is reachable at,
    /// e.g. `http://localhost:8091`.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it is missing
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// URL path segment the root is served under, e.g. `assets`
    pub fn url_prefix(&self) -> String {
        url_prefix(&self.root)
    }

    /// URL an asset at `filename` is served from
    pub fn url_for(&self, filename: &str) -> String {
        let prefix = self.url_prefix();
        if prefix.is_empty() {
            format!("{}/{}", self.base_url, filename)
        } else {
            format!("{}/{}/{}", self.base_url, prefix, filename)
        }
    }

    /// Create (or truncate) `root/filename` and copy the whole stream into it
    #[tracing::instrument(name = "storage.local.write", skip(self, body), fields(root = %self.root.display()), err)]
    pub async fn write(
        &self,
        filename: &str,
        mut body: BodyStream<'_>,
    ) -> Result<StoredAsset, StorageError> {
        let path = self.root.join(filename);
        let mut file = File::create(&path).await?;

        let mut bytes_written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!(
            path = %path.display(),
            bytes = bytes_written,
            "Stored asset on disk"
        );

        Ok(StoredAsset {
            url: self.url_for(filename),
            path,
            bytes_written,
        })
    }
}
