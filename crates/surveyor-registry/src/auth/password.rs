use super::AuthError;

/// Work factor used for stored admin hashes.
pub const DEFAULT_COST: u32 = 10;

/// Compares a candidate password against a bcrypt hash off the async runtime.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    Ok(outcome?)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}
