//! multipart/form-data field extraction
//!
//! Finds the named file field in a request body and hands it on as a stream,
//! without buffering the rest of the body. The size limit covers the whole
//! request stream.

use super::{UploadError, UploadedAsset};
use crate::storage::BodyError;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use hyper::header::CONTENT_TYPE;
use multer::{Constraints, Multipart, SizeLimit};

fn body_error(err: multer::Error) -> BodyError {
    match err {
        multer::Error::StreamSizeExceeded { limit } => BodyError::TooLarge { limit },
        multer::Error::FieldSizeExceeded { limit, .. } => BodyError::TooLarge { limit },
        other => BodyError::Read(other.to_string()),
    }
}

/// Locate `field_name` in a multipart body.
///
/// `request_content_type` is the request's own header, which carries the
/// boundary. The returned asset's content type is the part's raw header
/// value, or empty when the part declares none.
pub async fn read_file_field<S, E>(
    body: S,
    request_content_type: Option<&str>,
    field_name: &str,
    limit: u64,
) -> Result<UploadedAsset<'static>, UploadError>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let content_type = request_content_type
        .ok_or_else(|| UploadError::MalformedUpload("Missing Content-Type header".into()))?;
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| UploadError::MalformedUpload(format!("Unable to parse form: {}", e)))?;

    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
    let mut multipart = Multipart::with_constraints(body, boundary, constraints);

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| UploadError::from(body_error(e)))?
            .ok_or_else(|| {
                UploadError::MalformedUpload(format!("Unable to find form file '{}'", field_name))
            })?;

        if field.name() != Some(field_name) {
            tracing::debug!(field = ?field.name(), "Skipping form field");
            continue;
        }

        let part_content_type = field
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        return Ok(UploadedAsset {
            content_type: part_content_type,
            body: Box::pin(field.map(|chunk| chunk.map_err(body_error))),
        });
    }
}
