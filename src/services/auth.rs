use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Actor, Role};

/// Claims carried by access tokens. Tokens are issued elsewhere; this
/// service only verifies them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    /// Expiration timestamp (Unix epoch).
    pub exp: u64,
}

/// Verifies an HS256 token and returns the caller it vouches for.
pub fn decode_token(secret: &str, token: &str) -> Result<Actor, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "rejected token");
        AppError::Unauthorized
    })?;

    if data.claims.sub.trim().is_empty() {
        return Err(AppError::Unauthorized);
    }

    Ok(Actor {
        id: data.claims.sub,
        role: data.claims.role,
    })
}
