use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let result = match state.db.acquire().await {
        Ok(pool) => sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| state.db.report(e)),
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected" })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            let detail = if state.config.is_production() {
                "unavailable".to_string()
            } else {
                e.to_string()
            };
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "db": detail })),
            )
        }
    }
}
