use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use super::password::verify_password;
use super::tokens::TokenSigner;
use super::AuthError;
use crate::config::{AuthConfig, SessionDelivery};

pub const EXTENDED_SESSION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const SHORT_SESSION: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Absent means an extended session.
    #[serde(default)]
    pub remember: Option<bool>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("remember", &self.remember)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub username: String,
    pub ttl: Duration,
}

/// Checks the single configured admin account and mints session tokens.
#[derive(Clone)]
pub struct AdminAuthenticator {
    username: String,
    password_hash: Option<String>,
    signer: Option<TokenSigner>,
    delivery: SessionDelivery,
    cookie_name: String,
}

impl fmt::Debug for AdminAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAuthenticator")
            .field("username", &self.username)
            .field("delivery", &self.delivery)
            .field("cookie_name", &self.cookie_name)
            .finish_non_exhaustive()
    }
}

impl AdminAuthenticator {
    pub fn new(
        username: impl Into<String>,
        password_hash: Option<String>,
        signer: Option<TokenSigner>,
        delivery: SessionDelivery,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password_hash,
            signer,
            delivery,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.admin_username.clone(),
            config.admin_password_hash.clone(),
            config.jwt_secret.as_deref().map(TokenSigner::new),
            config.session_delivery,
            config.cookie_name.clone(),
        )
    }

    pub fn delivery(&self) -> SessionDelivery {
        self.delivery
    }

    pub async fn login(&self, request: LoginRequest) -> Result<IssuedSession, AuthError> {
        let (username, password) = match (request.username, request.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                (username, password)
            }
            _ => return Err(AuthError::MissingCredentials),
        };

        let signer = self
            .signer
            .as_ref()
            .ok_or(AuthError::Misconfigured("JWT_SECRET"))?;
        let hash = self
            .password_hash
            .clone()
            .ok_or(AuthError::Misconfigured("ADMIN_PASSWORD_HASH"))?;

        if username != self.username || !verify_password(password, hash).await? {
            warn!(%username, "admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let ttl = if request.remember.unwrap_or(true) {
            EXTENDED_SESSION
        } else {
            SHORT_SESSION
        };
        let token = signer.issue(&username, ttl)?;
        info!(%username, ttl_secs = ttl.as_secs(), "admin session issued");

        Ok(IssuedSession {
            token,
            username,
            ttl,
        })
    }

    /// `Set-Cookie` value carrying the session for cross-site browser clients.
    pub fn session_cookie(&self, session: &IssuedSession) -> String {
        format!(
            "{}={}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={}",
            self.cookie_name,
            session.token,
            session.ttl.as_secs()
        )
    }

    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0",
            self.cookie_name
        )
    }
}
