//! Application error type and its HTTP mapping.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::UserRole;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    MissingField(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error("User ID {0} not found in database. Please login again.")]
    UnknownIdentity(Uuid),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Access denied. Required role: {}", join_roles(.0))]
    RoleRequired(Vec<UserRole>),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Server error")]
    Storage(#[from] sqlx::Error),

    #[error("Server error")]
    Internal(String),
}

fn join_roles(roles: &[UserRole]) -> String {
    roles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingField(_)
            | AppError::InvalidReference(_)
            | AppError::UnknownIdentity(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::RoleRequired(_) | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `{message, error?}` body. Internal failure text only appears when `expose` is set.
    pub fn body(&self, expose: bool) -> Value {
        let mut body = json!({ "message": self.to_string() });
        match self {
            AppError::UnknownIdentity(_) => {
                body["error"] = json!("User not found");
            }
            AppError::RoleRequired(roles) => {
                body["required_roles"] = json!(roles);
            }
            AppError::Storage(e) if expose => {
                body["error"] = json!(e.to_string());
            }
            AppError::Internal(detail) if expose => {
                body["error"] = json!(detail);
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        let mut response = (status, Json(self.body(false))).into_response();
        if matches!(self, AppError::Storage(_) | AppError::Internal(_)) {
            response.extensions_mut().insert(ErrorDetail(self.body(true)));
        }
        response
    }
}

/// Detailed body of an internal failure, carried on the response until
/// [`render_details`] decides whether the client gets it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub Value);

/// Response mapper installed by the router; `expose` is false in production.
pub async fn render_details(State(expose): State<bool>, mut response: Response) -> Response {
    match response.extensions_mut().remove::<ErrorDetail>() {
        Some(ErrorDetail(body)) if expose => (response.status(), Json(body)).into_response(),
        _ => response,
    }
}
