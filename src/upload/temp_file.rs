//! Scoped temporary file for video uploads
//!
//! The upload body is spooled here so the probe can read it from disk and the
//! object store can stream it back out. The file is removed when the guard is
//! dropped, on every exit path of the request.
//!
//! # Example
//!
//! ```no_run
//! use tubely_ingest::upload::temp_file::TempUpload;
//!
//! # async fn example() -> std::io::Result<()> {
//! let mut temp = TempUpload::create(&std::env::temp_dir(), "tubely-upload").await?;
//! println!("Spooling to {:?}", temp.path());
//! temp.rewind().await?;
//! # Ok(())
//! # }
//! ```

use crate::storage::{BodyStream, StorageError};
use futures::StreamExt;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// Temporary file removed on drop (RAII)
pub struct TempUpload {
    path: PathBuf,
    file: File,
    size: u64,
}

impl TempUpload {
    /// Create a new, empty temp file in `dir`
    pub async fn create(dir: &Path, prefix: &str) -> io::Result<Self> {
        let path = dir.join(format!("{}-{}.tmp", prefix, uuid::Uuid::new_v4()));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file,
            size: 0,
        })
    }

    /// Get the path to the temp file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the whole stream and flush it to the OS
    pub async fn write_stream(&mut self, mut body: BodyStream<'_>) -> Result<u64, StorageError> {
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            self.file.write_all(&chunk).await?;
            self.size += chunk.len() as u64;
        }
        self.file.flush().await?;
        Ok(self.size)
    }

    /// Seek back to the start of the file
    pub async fn rewind(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.seek(SeekFrom::Start(0)).await?;
        Ok(())
    }

    /// A second handle sharing the current position, for streaming the
    /// contents elsewhere
    pub async fn reader(&self) -> io::Result<File> {
        self.file.try_clone().await
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to clean up temp file"
                );
            }
        }
    }
}
