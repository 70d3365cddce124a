//! Upload module
//!
//! The upload-and-placement pipeline: classify, probe, name, store, commit.

use crate::auth::AuthError;
use crate::db::RecordStoreError;
use crate::media::MediaError;
use crate::probe::ProbeError;
use crate::s3::ObjectStoreError;
use crate::storage::{BodyError, BodyStream, StorageError};
use hyper::StatusCode;
use thiserror::Error;
use uuid::Uuid;

pub mod multipart;
pub mod pipeline;
pub mod temp_file;

pub use pipeline::{OwnedRecord, PipelineSettings, UploadPipeline};

/// Upload errors
///
/// Every stage failure ends the request; nothing is retried.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(#[from] AuthError),

    #[error("User {user_id} does not own video {video_id}")]
    Forbidden { user_id: Uuid, video_id: Uuid },

    #[error("Video {0} not found")]
    RecordNotFound(Uuid),

    #[error(transparent)]
    UnsupportedMediaType(#[from] MediaError),

    #[error("Payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    #[error("Probe failed: {0}")]
    ProbeFailed(#[from] ProbeError),

    #[error("IO error: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    StoreFailure(#[from] ObjectStoreError),

    #[error("Record lookup failed: {0}")]
    LookupFailed(RecordStoreError),

    #[error("Record update failed: {0}")]
    UpdateFailed(RecordStoreError),
}

impl UploadError {
    /// HTTP status returned to the client
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::BadRequest(_) => StatusCode::BAD_REQUEST,
            UploadError::Unauthenticated(_) | UploadError::Forbidden { .. } => {
                StatusCode::UNAUTHORIZED
            }
            UploadError::RecordNotFound(_)
            | UploadError::LookupFailed(_)
            | UploadError::PayloadTooLarge { .. }
            | UploadError::UnsupportedMediaType(_)
            | UploadError::MalformedUpload(_)
            | UploadError::ProbeFailed(_)
            | UploadError::IoFailure(_)
            | UploadError::StoreFailure(_)
            | UploadError::UpdateFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            UploadError::BadRequest(msg) => msg.clone(),
            UploadError::Unauthenticated(AuthError::MissingAuth) => "Couldn't find JWT".into(),
            UploadError::Unauthenticated(_) => "Couldn't validate JWT".into(),
            UploadError::Forbidden { .. } => "You don't own this video".into(),
            UploadError::RecordNotFound(_) | UploadError::LookupFailed(_) => {
                "Couldn't find video".into()
            }
            UploadError::UnsupportedMediaType(e) => e.to_string(),
            UploadError::PayloadTooLarge { limit } => {
                format!("Upload exceeds the {} byte limit", limit)
            }
            UploadError::MalformedUpload(msg) => msg.clone(),
            UploadError::ProbeFailed(_) => "Couldn't read video metadata".into(),
            UploadError::IoFailure(_) => "Couldn't store file".into(),
            UploadError::StoreFailure(_) => "Couldn't upload video".into(),
            UploadError::UpdateFailed(_) => "Couldn't update video".into(),
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::BadRequest(_) => "bad_request",
            UploadError::Unauthenticated(_) => "unauthenticated",
            UploadError::Forbidden { .. } => "forbidden",
            UploadError::RecordNotFound(_) => "not_found",
            UploadError::LookupFailed(_) => "lookup_failed",
            UploadError::UnsupportedMediaType(_) => "unsupported_media_type",
            UploadError::PayloadTooLarge { .. } => "payload_too_large",
            UploadError::MalformedUpload(_) => "malformed_upload",
            UploadError::ProbeFailed(_) => "probe_failed",
            UploadError::IoFailure(_) => "io_failure",
            UploadError::StoreFailure(_) => "store_failure",
            UploadError::UpdateFailed(_) => "update_failed",
        }
    }
}

impl From<BodyError> for UploadError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::TooLarge { limit } => UploadError::PayloadTooLarge { limit },
            BodyError::Read(msg) => UploadError::MalformedUpload(msg),
        }
    }
}

impl From<StorageError> for UploadError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => UploadError::IoFailure(e),
            StorageError::Body(e) => e.into(),
        }
    }
}

/// Upload kinds, each with its own form field and storage path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Thumbnail,
    Video,
}

impl UploadKind {
    /// Multipart form field carrying the file
    pub fn field_name(&self) -> &'static str {
        match self {
            UploadKind::Thumbnail => "thumbnail",
            UploadKind::Video => "video",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.field_name()
    }
}

/// One inbound file: its declared content type and streamed bytes
pub struct UploadedAsset<'a> {
    pub content_type: String,
    pub body: BodyStream<'a>,
}

impl std::fmt::Debug for UploadedAsset<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedAsset")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
