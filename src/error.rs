//! Error taxonomy for authentication, authorization and credential handling.
//!
//! `AuthError` is returned from handlers and middleware and converted into the fixed
//! `{ "message": ... }` responses clients observe.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::MessageResponse;

pub const MISSING_TOKEN_MESSAGE: &str = "Unauthorized, no token provided";
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token";
pub const DENIED_MESSAGE: &str = "Access denied";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";
pub const DUPLICATE_USER_MESSAGE: &str = "User already exists";
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Result type alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing signing secret or another startup-time misconfiguration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad input at registration (unknown role, empty username or password).
    #[error("validation error: {0}")]
    Validation(String),

    #[error("user already exists")]
    DuplicateUser,

    /// Unknown username and wrong password are deliberately the same variant.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no bearer token provided")]
    MissingToken,

    /// Bad signature, undecodable payload, or expired token.
    #[error("invalid token")]
    InvalidToken,

    /// Verified identity whose role is not permitted on the route.
    #[error("access denied")]
    Denied,

    /// Storage outage or hashing failure. Details are logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            // 400 for a bad or expired token is the established contract of this API.
            AuthError::InvalidToken | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Denied => StatusCode::FORBIDDEN,
            AuthError::DuplicateUser => StatusCode::CONFLICT,
            AuthError::Configuration(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The client-facing message. Internal details never leave the process.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::MissingToken => MISSING_TOKEN_MESSAGE.to_string(),
            AuthError::InvalidToken => INVALID_TOKEN_MESSAGE.to_string(),
            AuthError::Denied => DENIED_MESSAGE.to_string(),
            AuthError::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_string(),
            AuthError::DuplicateUser => DUPLICATE_USER_MESSAGE.to_string(),
            AuthError::Validation(detail) => detail.clone(),
            AuthError::Configuration(_) | AuthError::Internal(_) => INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Configuration(_) | AuthError::Internal(_) = &self {
            tracing::error!(error = %self, "request failed");
        }
        (self.status(), Json(MessageResponse::new(self.public_message()))).into_response()
    }
}

/// StoreError
///
/// Failures reported by the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key (the username) already exists.
    #[error("duplicate key")]
    Duplicate,

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AuthError::DuplicateUser,
            StoreError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}
