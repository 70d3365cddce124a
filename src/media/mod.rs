//! Media type classification
//!
//! Parses a declared `Content-Type` into its base media type, checks it
//! against the allow-list for the upload kind, and derives the file extension
//! used in storage keys.

use thiserror::Error;

/// Media types accepted for thumbnails
pub const THUMBNAIL_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Media types accepted for videos
pub const VIDEO_MEDIA_TYPES: &[&str] = &["video/mp4"];

/// Classification errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MediaError {
    #[error("Malformed media type '{0}'")]
    Malformed(String),

    #[error("Unsupported media type '{0}'")]
    Unsupported(String),
}

/// A declared media type that passed the allow-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedMedia {
    essence: String,
    extension: String,
}

impl ClassifiedMedia {
    /// Base media type without parameters, e.g. `image/png`
    pub fn media_type(&self) -> &str {
        &self.essence
    }

    /// Extension used for the stored file name
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Classify a raw `Content-Type` value against `allowed`.
///
/// The extension is everything after the first `/` of the raw header value,
/// parameters included, so `image/png` yields `png`.
///
/// # Example
///
/// ```
/// use tubely_ingest::media::{classify, THUMBNAIL_MEDIA_TYPES};
///
/// let media = classify("image/jpeg", THUMBNAIL_MEDIA_TYPES).unwrap();
/// assert_eq!(media.media_type(), "image/jpeg");
/// assert_eq!(media.extension(), "jpeg");
/// ```
pub fn classify(content_type: &str, allowed: &[&str]) -> Result<ClassifiedMedia, MediaError> {
    let parsed: mime::Mime = content_type
        .trim()
        .parse()
        .map_err(|_| MediaError::Malformed(content_type.to_string()))?;

    let essence = parsed.essence_str().to_string();
    if !allowed.contains(&essence.as_str()) {
        return Err(MediaError::Unsupported(essence));
    }

    let extension = content_type
        .split('/')
        .nth(1)
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| MediaError::Malformed(content_type.to_string()))?
        .to_string();

    Ok(ClassifiedMedia { essence, extension })
}
