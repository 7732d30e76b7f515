use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::tokens::{AdminClaims, TokenSigner};
use super::AuthError;
use crate::config::AuthConfig;
use crate::error::AppError;

/// Verified caller, inserted into request extensions by [`require_admin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession(pub AdminClaims);

impl AdminSession {
    pub fn username(&self) -> &str {
        &self.0.username
    }
}

/// Verifies session tokens presented as `Authorization: Bearer` or as the
/// session cookie. The header wins when both are sent.
#[derive(Debug, Clone)]
pub struct AdminGate {
    signer: Option<TokenSigner>,
    cookie_name: String,
}

impl AdminGate {
    pub fn new(signer: Option<TokenSigner>, cookie_name: impl Into<String>) -> Self {
        Self {
            signer,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_deref().map(TokenSigner::new),
            config.cookie_name.clone(),
        )
    }

    pub fn signer(&self) -> Result<&TokenSigner, AuthError> {
        self.signer
            .as_ref()
            .ok_or(AuthError::Misconfigured("JWT_SECRET"))
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn authorize(&self, headers: &HeaderMap) -> Result<AdminSession, AuthError> {
        let token = bearer_token(headers)
            .or_else(|| cookie_value(headers, &self.cookie_name))
            .ok_or(AuthError::MissingToken)?;

        let claims = self.signer()?.verify(token)?;
        if !claims.is_admin() {
            return Err(AuthError::Forbidden);
        }
        Ok(AdminSession(claims))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

/// Middleware for admin-only routes.
pub async fn require_admin(
    State(gate): State<AdminGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = gate.authorize(request.headers()).map_err(|err| {
        debug!(path = %request.uri().path(), error = %err, "admin gate rejected request");
        err
    })?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
