use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        auth::AuthenticatedUser,
        user::{AuthResponse, LoginRequest, RegisterRequest, VerifyResponse},
    },
    services::auth::AuthService,
    AppState,
};

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let response = AuthService::login(&state.db, &state.config, &req).await?;
    Ok(Json(response))
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let response = AuthService::register(&state.db, &state.config, &req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// The extractor has already checked signature and expiry.
pub async fn verify(user: AuthenticatedUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user_id: user.user_id,
        role: user.role,
    })
}
