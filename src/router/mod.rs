//! Request router
//!
//! Maps method and path to a [`Route`]. Video IDs are parsed here so a
//! malformed ID is rejected before authentication runs.

use thiserror::Error;
use uuid::Uuid;

/// Router errors
#[derive(Error, Debug, PartialEq)]
pub enum RouterError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Invalid ID: {0}")]
    InvalidVideoId(String),
}

/// Routes served by the ingest server
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// GET /health
    Health,
    /// POST /videos/{id}/thumbnail
    UploadThumbnail { video_id: Uuid },
    /// POST /videos/{id}/video
    UploadVideo { video_id: Uuid },
    /// GET /{assets}/{file}
    Asset { file: String },
}

/// Request parser
pub struct RequestParser {
    assets_prefix: String,
}

impl RequestParser {
    /// `assets_prefix` is the URL segment locally stored assets are served
    /// under. Empty disables asset serving.
    pub fn new(assets_prefix: impl Into<String>) -> Self {
        Self {
            assets_prefix: assets_prefix.into().trim_matches('/').to_string(),
        }
    }

    /// Parse an HTTP method and path into a route
    pub fn parse(&self, method: &str, path: &str) -> Result<Route, RouterError> {
        let trimmed = path.trim_start_matches('/');
        let parts: Vec<&str> = trimmed.split('/').collect();

        match parts.as_slice() {
            ["health"] => {
                Self::require(method, "GET", path)?;
                Ok(Route::Health)
            }
            ["videos", id, action @ ("thumbnail" | "video")] => {
                Self::require(method, "POST", path)?;
                let video_id =
                    Uuid::parse_str(id).map_err(|_| RouterError::InvalidVideoId(id.to_string()))?;
                if *action == "thumbnail" {
                    Ok(Route::UploadThumbnail { video_id })
                } else {
                    Ok(Route::UploadVideo { video_id })
                }
            }
            _ => self.parse_asset(method, trimmed, path),
        }
    }

    fn parse_asset(&self, method: &str, trimmed: &str, path: &str) -> Result<Route, RouterError> {
        if self.assets_prefix.is_empty() {
            return Err(RouterError::NotFound(path.to_string()));
        }

        let file = trimmed
            .strip_prefix(self.assets_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|file| is_plain_file_name(file))
            .ok_or_else(|| RouterError::NotFound(path.to_string()))?;

        if method != "GET" && method != "HEAD" {
            return Err(RouterError::MethodNotAllowed(format!(
                "Method {} not allowed",
                method
            )));
        }

        Ok(Route::Asset {
            file: file.to_string(),
        })
    }

    fn require(method: &str, expected: &str, path: &str) -> Result<(), RouterError> {
        if method == expected {
            Ok(())
        } else {
            Err(RouterError::MethodNotAllowed(format!(
                "Method {} not allowed on {}",
                method, path
            )))
        }
    }
}

/// A single path segment that cannot leave the assets root
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
