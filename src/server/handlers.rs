//! Request handlers
//!
//! Route dispatch, the two upload endpoints, asset serving and JSON
//! responses. Upload requests run in this order: video ID (in the router),
//! authentication, ownership, form parsing, then the pipeline.

use super::http_tracing::{create_request_span, record_response};
use super::AppState;
use crate::auth::AuthRequest;
use crate::db::VideoRecord;
use crate::metrics;
use crate::router::{Route, RouterError};
use crate::upload::multipart::read_file_field;
use crate::upload::{UploadError, UploadKind};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{Instrument, Span};
use uuid::Uuid;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Handle one HTTP request
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let span = create_request_span(req.method(), req.uri().path(), req.headers());
    let response = dispatch(req, &state).instrument(span.clone()).await;
    record_response(&span, response.status());
    Ok(response)
}

async fn dispatch<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let route = match state.router.parse(req.method().as_str(), req.uri().path()) {
        Ok(route) => route,
        Err(RouterError::NotFound(_)) => return error_response(StatusCode::NOT_FOUND, "Not Found"),
        Err(RouterError::MethodNotAllowed(msg)) => {
            return error_response(StatusCode::METHOD_NOT_ALLOWED, &msg)
        }
        Err(RouterError::InvalidVideoId(_)) => {
            return upload_error_response(&UploadError::BadRequest("Invalid ID".into()))
        }
    };

    match route {
        Route::Health => full(StatusCode::OK, HeaderValue::from_static("text/plain"), "ok"),
        Route::UploadThumbnail { video_id } => {
            upload(req, state, video_id, UploadKind::Thumbnail).await
        }
        Route::UploadVideo { video_id } => upload(req, state, video_id, UploadKind::Video).await,
        Route::Asset { file } => serve_asset(state, &file, req.method() == Method::HEAD).await,
    }
}

async fn upload<B>(
    req: Request<B>,
    state: &AppState,
    video_id: Uuid,
    kind: UploadKind,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    Span::current().record("video.id", tracing::field::display(video_id));

    match run_upload(req, state, video_id, kind).await {
        Ok(record) => json_response(StatusCode::OK, &record),
        Err(e) => {
            if e.status().is_server_error() {
                tracing::error!(error = %e, kind = kind.as_str(), "Upload failed");
            } else {
                tracing::warn!(error = %e, kind = kind.as_str(), "Upload rejected");
            }
            upload_error_response(&e)
        }
    }
}

async fn run_upload<B>(
    req: Request<B>,
    state: &AppState,
    video_id: Uuid,
    kind: UploadKind,
) -> Result<VideoRecord, UploadError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let auth_request =
        AuthRequest::from_headers(req.headers(), req.method().as_str(), req.uri().path());
    let auth = state.authenticator.authenticate(&auth_request).await;
    metrics::record_auth_attempt(auth.is_ok());
    let user_id = auth?.user_id;
    Span::current().record("enduser.id", tracing::field::display(user_id));

    let owned = state.pipeline.authorize(video_id, user_id).await?;

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let asset = read_file_field(
        req.into_body().into_data_stream(),
        content_type.as_deref(),
        kind.field_name(),
        state.limits.for_kind(kind),
    )
    .await?;

    tracing::info!(
        video_id = %video_id,
        user_id = %user_id,
        content_type = %asset.content_type,
        "Uploading {}",
        kind.as_str()
    );

    match kind {
        UploadKind::Thumbnail => state.pipeline.upload_thumbnail(owned, asset).await,
        UploadKind::Video => state.pipeline.upload_video(owned, asset).await,
    }
}

async fn serve_asset(state: &AppState, file: &str, head_only: bool) -> Response<Full<Bytes>> {
    let path = state.assets_root.join(file);

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return error_response(StatusCode::NOT_FOUND, "Not Found")
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read asset");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Couldn't read asset");
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.essence_str())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let length = data.len();

    let body = if head_only { Bytes::new() } else { Bytes::from(data) };
    let mut response = full(StatusCode::OK, content_type, body);
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(length));
    response
}

fn full(
    status: StatusCode,
    content_type: HeaderValue,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => full(status, HeaderValue::from_static("application/json"), body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response");
            full(
                StatusCode::INTERNAL_SERVER_ERROR,
                HeaderValue::from_static("application/json"),
                r#"{"error":"Couldn't encode response"}"#,
            )
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &ErrorBody { error: message })
}

fn upload_error_response(err: &UploadError) -> Response<Full<Bytes>> {
    error_response(err.status(), &err.public_message())
}
