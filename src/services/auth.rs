use chrono::Duration;

use crate::{
    config::Config,
    db::PoolManager,
    error::{AppError, AppResult},
    models::user::{AuthResponse, LoginRequest, RegisterRequest, User, UserProfile, UserRole},
    services::token,
};

const BCRYPT_COST: u32 = 10;
const MIN_PASSWORD_LEN: usize = 6;

pub struct AuthService;

impl AuthService {
    /// `username` may be either the username or the email address.
    pub async fn login(db: &PoolManager, config: &Config, req: &LoginRequest) -> AppResult<AuthResponse> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::BadRequest("Username and password are required".into()));
        }

        let pool = db.acquire().await?;
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, name, role, created_at
             FROM users WHERE username = $1 OR email = $1
             LIMIT 1",
        )
        .bind(req.username.trim())
        .fetch_optional(&pool)
        .await
        .map_err(|e| db.report(e))?;

        let invalid = || AppError::Unauthenticated("Invalid username or password".into());
        let user = user.ok_or_else(invalid)?;

        let valid = bcrypt::verify(&req.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("bcrypt verify: {e}")))?;
        if !valid {
            tracing::warn!(username = %req.username, "failed login attempt");
            return Err(invalid());
        }

        tracing::info!(user_id = %user.id, "user logged in");
        respond(user, config)
    }

    pub async fn register(db: &PoolManager, config: &Config, req: &RegisterRequest) -> AppResult<AuthResponse> {
        let role = validate_registration(req)?;
        let pool = db.acquire().await?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(req.username.trim())
        .bind(req.email.trim())
        .fetch_one(&pool)
        .await
        .map_err(|e| db.report(e))?;
        if taken {
            return Err(duplicate());
        }

        let hash = bcrypt::hash(&req.password, BCRYPT_COST)
            .map_err(|e| AppError::Internal(format!("bcrypt hash: {e}")))?;

        // The unique constraints still catch a concurrent registration.
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, name, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, username, email, password_hash, name, role, created_at",
        )
        .bind(req.username.trim())
        .bind(req.email.trim())
        .bind(&hash)
        .bind(req.name.trim())
        .bind(role.to_string())
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                duplicate()
            } else {
                AppError::Storage(db.report(e))
            }
        })?;

        tracing::info!(user_id = %user.id, %role, "user registered");
        respond(user, config)
    }
}

fn duplicate() -> AppError {
    AppError::Conflict("Username or email already exists".into())
}

/// Presence, password length and role; returns the role to store.
fn validate_registration(req: &RegisterRequest) -> AppResult<UserRole> {
    let blank = [&req.username, &req.email, &req.password, &req.name]
        .iter()
        .any(|v| v.trim().is_empty());
    if blank {
        return Err(AppError::BadRequest("All fields are required".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    match req.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(UserRole::Student),
        Some(role) => role.parse().map_err(|e: anyhow::Error| AppError::BadRequest(e.to_string())),
    }
}

fn respond(user: User, config: &Config) -> AppResult<AuthResponse> {
    let role: UserRole = user
        .role
        .parse()
        .map_err(|e: anyhow::Error| AppError::Internal(e.to_string()))?;
    let token = token::issue(
        user.id,
        role,
        &config.jwt_secret,
        Duration::days(config.jwt_expiry_days),
    )?;

    Ok(AuthResponse {
        user: UserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            role,
        },
        token,
    })
}
