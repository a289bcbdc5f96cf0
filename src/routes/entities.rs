//! One handler set shared by every CRUD resource; the descriptor arrives as a request extension.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::authorize,
    models::{auth::AuthenticatedUser, entity::EntityDescriptor},
    services::repository::Repository,
    AppState,
};

type Entity = Extension<&'static EntityDescriptor>;

pub fn routes(entity: &'static EntityDescriptor) -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .layer(Extension(entity))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(entity): Entity,
    user: AuthenticatedUser,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Value>>> {
    authorize(&user, entity.access.read)?;
    let parent = parent_filter(entity, &params)?;
    let rows = Repository::new(&state.db, entity).list(&user, parent).await?;
    Ok(Json(rows))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(entity): Entity,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    authorize(&user, entity.access.read)?;
    let id = parse_id(entity, &id)?;
    let row = Repository::new(&state.db, entity).get(&user, id).await?;
    Ok(Json(row))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(entity): Entity,
    user: AuthenticatedUser,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    authorize(&user, entity.access.create)?;
    let body = object(body)?;
    let row = Repository::new(&state.db, entity).create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(entity): Entity,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    authorize(&user, entity.access.modify)?;
    let id = parse_id(entity, &id)?;
    let body = object(body)?;
    let row = Repository::new(&state.db, entity).update(&user, id, body).await?;
    Ok(Json(row))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(entity): Entity,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    authorize(&user, entity.access.modify)?;
    let id = parse_id(entity, &id)?;
    let ack = Repository::new(&state.db, entity).delete(&user, id).await?;
    Ok(Json(ack))
}

fn parse_id(entity: &EntityDescriptor, raw: &str) -> AppResult<Uuid> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} id", entity.label)))
}

fn parent_filter(
    entity: &EntityDescriptor,
    params: &HashMap<String, String>,
) -> AppResult<Option<Uuid>> {
    let Some(column) = entity.parent_filter else {
        return Ok(None);
    };
    match params.get(column).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid {column}"))),
    }
}

fn object(body: Result<Json<Value>, JsonRejection>) -> AppResult<Map<String, Value>> {
    let Json(value) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest("Request body must be a JSON object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{category::CATEGORIES, subject::SUBJECTS};

    #[test]
    fn parent_filter_only_applies_to_child_levels() {
        let mut params = HashMap::new();
        params.insert("sub_category_id".to_string(), Uuid::nil().to_string());
        assert_eq!(parent_filter(&SUBJECTS, &params).unwrap(), Some(Uuid::nil()));
        assert_eq!(parent_filter(&CATEGORIES, &params).unwrap(), None);
    }

    #[test]
    fn blank_parent_filter_is_ignored() {
        let mut params = HashMap::new();
        params.insert("sub_category_id".to_string(), " ".to_string());
        assert_eq!(parent_filter(&SUBJECTS, &params).unwrap(), None);
    }

    #[test]
    fn malformed_parent_filter_is_a_bad_request() {
        let mut params = HashMap::new();
        params.insert("sub_category_id".to_string(), "seven".to_string());
        assert!(matches!(
            parent_filter(&SUBJECTS, &params),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(object(Ok(Json(serde_json::json!([1, 2])))).is_err());
        assert!(object(Ok(Json(serde_json::json!({ "name": "x" })))).is_ok());
    }
}
