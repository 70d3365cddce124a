//! Inline asset encoding
//!
//! Turns a payload into a self-contained `data:{type};base64,{payload}` URL.
//! The whole payload is buffered; callers cap its size upstream.

use super::{BodyStream, StorageError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::BytesMut;
use futures::StreamExt;

/// Encoder for `data:` URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineAssetEncoder;

impl InlineAssetEncoder {
    /// Read the full stream and encode it
    pub async fn encode(
        &self,
        mut body: BodyStream<'_>,
        media_type: &str,
    ) -> Result<String, StorageError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        tracing::debug!(bytes = buffer.len(), media_type, "Encoding inline asset");
        Ok(data_url(&buffer, media_type))
    }
}

/// Format bytes as a base64 `data:` URL (standard alphabet, padded)
pub fn data_url(bytes: &[u8], media_type: &str) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}
