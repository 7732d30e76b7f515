//! Single-account admin authentication: bcrypt password check, HS256 session
//! tokens, and the middleware guarding admin-only routes.

pub mod gate;
pub mod login;
pub mod password;
pub mod router;
pub mod tokens;

use axum::http::StatusCode;

pub use gate::{require_admin, AdminGate, AdminSession};
pub use login::{AdminAuthenticator, IssuedSession, LoginRequest};
pub use password::{hash_password, verify_password, DEFAULT_COST};
pub use router::auth_router;
pub use tokens::{AdminClaims, TokenSigner, ADMIN_ROLE};

/// Display strings double as the client-facing message for the non-internal variants.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("Forbidden")]
    Forbidden,
    #[error("username and password required")]
    MissingCredentials,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Server misconfigured: {0} missing")]
    Misconfigured(&'static str),
    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("password check did not complete: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
            AuthError::Misconfigured(_)
            | AuthError::Hashing(_)
            | AuthError::Signing(_)
            | AuthError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Failures whose detail stays in the logs.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Hashing(_) | AuthError::Signing(_) | AuthError::Interrupted(_)
        )
    }
}
