//! Authentication module
//!
//! Resolves the acting user of a request from a bearer JWT.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

pub mod jwt;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid signature")]
    InvalidSignature,
}

/// Authentication result
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub user_id: Uuid,
}

/// Authenticator trait
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError>;
}

/// Authentication request context
///
/// Header names are stored lowercased.
#[derive(Debug, Default)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub method: String,
    pub path: String,
}

impl AuthRequest {
    /// Build from a header map, lowercasing names and skipping non-UTF-8 values
    pub fn from_headers(headers: &hyper::HeaderMap, method: &str, path: &str) -> Self {
        let headers = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();

        Self {
            headers,
            method: method.to_string(),
            path: path.to_string(),
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(request: &AuthRequest) -> Result<&str, AuthError> {
    let header = request
        .headers
        .get("authorization")
        .ok_or(AuthError::MissingAuth)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::MissingAuth)?;

    if token.is_empty() {
        return Err(AuthError::MissingAuth);
    }
    Ok(token)
}
