//! Token authentication for the profiles API.
//!
//! Login issues HS256 JWTs whose subject is the profile id. Requests carry
//! them as `Authorization: Token <jwt>` or `Authorization: Bearer <jwt>`.
//! A request without the header is anonymous; a malformed or expired token
//! is rejected with 401.

use crate::routes::{error_response, ApiError};
use anyhow::Result;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authorization schemes accepted in front of the token.
const SCHEMES: &[&str] = &["Token ", "Bearer "];

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (profile ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authentication state shared across requests.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: Arc<String>,
    pub token_expiry_secs: u64,
}

impl AuthState {
    pub fn new(jwt_secret: impl Into<String>, token_expiry_secs: u64) -> Self {
        Self {
            jwt_secret: Arc::new(jwt_secret.into()),
            token_expiry_secs,
        }
    }

    /// Generate a token for a profile.
    pub fn generate_token(&self, profile_id: i64) -> Result<String> {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: profile_id.to_string(),
            exp: now + self.token_expiry_secs as usize,
            iat: now,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Validate a token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

/// The authenticated profile for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub profile_id: i64,
}

/// Strip a supported scheme from an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    SCHEMES
        .iter()
        .find_map(|scheme| value.strip_prefix(scheme))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the `Authorization` header, if any, into an [`AuthUser`].
///
/// Anonymous requests pass through untouched.
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or_else(|| invalid_token("Invalid token header"))?;

    let claims = auth_state.validate_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected token");
        invalid_token("Invalid token")
    })?;

    let profile_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| invalid_token("Invalid token"))?;

    request.extensions_mut().insert(AuthUser { profile_id });
    Ok(next.run(request).await)
}

fn invalid_token(message: &str) -> ApiError {
    error_response(StatusCode::UNAUTHORIZED, message, "AUTH_INVALID_TOKEN")
}

/// Handlers that take `AuthUser` require authentication; `Option<AuthUser>`
/// makes it optional.
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().copied().ok_or_else(|| {
            error_response(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided",
                "AUTH_REQUIRED",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let auth = AuthState::new("test-secret-key-32-bytes-long!!", 3600);
        let token = auth.generate_token(42).unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_invalid_token() {
        let auth = AuthState::new("test-secret-key-32-bytes-long!!", 3600);
        assert!(auth.validate_token("invalid-token").is_err());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issuer = AuthState::new("secret-one-secret-one-secret-one", 3600);
        let verifier = AuthState::new("secret-two-secret-two-secret-two", 3600);
        let token = issuer.generate_token(1).unwrap();
        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn test_bearer_token_schemes() {
        assert_eq!(bearer_token("Token abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Token "), None);
    }
}
