use std::fmt;
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;

pub const ADMIN_ROLE: &str = "admin";

/// Payload carried by every session token.
///
/// Only `role` and `exp` are load-bearing. A token without a role does not
/// decode and counts as invalid; a token with any other role decodes and is
/// refused by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    pub role: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub iat: u64,
    pub exp: u64,
}

impl AdminClaims {
    pub fn admin(username: impl Into<String>, ttl: Duration) -> Self {
        let now = jsonwebtoken::get_current_timestamp();
        Self {
            role: ADMIN_ROLE.to_string(),
            username: username.into(),
            iat: now,
            exp: now + ttl.as_secs(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// HS256 signer and verifier sharing one server-held secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn sign(&self, claims: &AdminClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn issue(&self, username: &str, ttl: Duration) -> Result<String, AuthError> {
        self.sign(&AdminClaims::admin(username, ttl))
    }

    /// Checks signature and expiry. The role is left to the caller.
    pub fn verify(&self, token: &str) -> Result<AdminClaims, AuthError> {
        decode::<AdminClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}
