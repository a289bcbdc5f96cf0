use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    error::AppError,
    models::{auth::AuthenticatedUser, user::UserRole},
    services::token,
};

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthenticated("No token provided".into()))?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or_else(|| AppError::Internal("JWT secret not configured".into()))?;

        token::verify(token, &secret.0)
    }
}

/// Extension type to carry the JWT secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// Reject `user` unless its role is one of `allowed`.
pub fn authorize(user: &AuthenticatedUser, allowed: &[UserRole]) -> Result<(), AppError> {
    if user.has_role(allowed) {
        Ok(())
    } else {
        Err(AppError::RoleRequired(allowed.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn role_in_set_passes() {
        assert!(authorize(&user(UserRole::Admin), &[UserRole::Admin]).is_ok());
        assert!(authorize(&user(UserRole::Tutor), &[UserRole::Mentor, UserRole::Tutor]).is_ok());
    }

    #[test]
    fn role_outside_set_is_forbidden_with_accepted_roles() {
        let err = authorize(&user(UserRole::Student), &[UserRole::Admin, UserRole::Mentor])
            .unwrap_err();
        match err {
            AppError::RoleRequired(roles) => {
                assert_eq!(roles, vec![UserRole::Admin, UserRole::Mentor])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
