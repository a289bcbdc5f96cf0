use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        auth::{AuthenticatedUser, Claims},
        user::UserRole,
    },
};

/// Sign an HS256 access token binding `user_id` and `role`, valid for `ttl`.
pub fn issue(user_id: Uuid, role: UserRole, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let expires = now
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal("token lifetime out of range".into()))?;
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp().max(0) as usize,
        exp: expires.timestamp().max(0) as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))
}

/// Check signature and expiry, returning the identity the token was issued for.
pub fn verify(token: &str, secret: &str) -> Result<AuthenticatedUser, AppError> {
    let invalid = || AppError::Unauthenticated("Invalid or expired token".into());

    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|_| invalid())?;
    let user_id = data.claims.sub.parse().map_err(|_| invalid())?;

    Ok(AuthenticatedUser {
        user_id,
        role: data.claims.role,
    })
}
