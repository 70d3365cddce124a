//! JWT Authentication
//!
//! HS256 tokens signed with the service secret. The `sub` claim carries the
//! user ID.

use super::{extract_bearer_token, AuthError, AuthRequest, AuthResult, Authenticator};
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub iss: Option<String>,
}

/// JWT Authenticator
///
/// # Example
///
/// ```
/// use tubely_ingest::auth::jwt::JwtAuthenticator;
///
/// let auth = JwtAuthenticator::new_hs256("my-secret").with_issuer("tubely-access");
/// ```
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Create a new JWT authenticator with a secret key (HS256)
    pub fn new_hs256(secret: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Set the required issuer (`iss` claim)
    #[must_use]
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Validate a raw token and return the user ID it was issued to
    pub fn validate_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;

        Uuid::parse_str(&token_data.claims.sub)
            .map_err(|e| AuthError::InvalidToken(format!("subject is not a user ID: {}", e)))
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    #[tracing::instrument(name = "auth.jwt", skip(self, request), fields(auth.method = "jwt"), err)]
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError> {
        let token = extract_bearer_token(request)?;
        let user_id = self.validate_token(token)?;

        tracing::debug!(user_id = %user_id, "JWT authentication successful");

        Ok(AuthResult { user_id })
    }
}
