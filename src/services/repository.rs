use serde_json::{json, Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::PoolManager,
    error::{AppError, AppResult},
    models::{
        auth::AuthenticatedUser,
        entity::{EntityDescriptor, Field, Reference, SqlValue, WriteMode},
    },
};

/// CRUD over one entity, driven entirely by its descriptor.
///
/// Reads go through the descriptor's lookup view and come back as JSON objects
/// (`to_jsonb` of the view row), so every entity shares one code path.
pub struct Repository<'a> {
    db: &'a PoolManager,
    entity: &'static EntityDescriptor,
}

impl<'a> Repository<'a> {
    pub fn new(db: &'a PoolManager, entity: &'static EntityDescriptor) -> Self {
        Self { db, entity }
    }

    pub async fn list(
        &self,
        user: &AuthenticatedUser,
        parent: Option<Uuid>,
    ) -> AppResult<Vec<Value>> {
        let pool = self.pool().await?;

        let err = match list_query(self.entity, self.entity.view, user, parent)
            .build_query_scalar::<Value>()
            .fetch_all(&pool)
            .await
        {
            Ok(rows) => return Ok(rows),
            Err(err) => err,
        };

        let Some(fallback) = self.entity.fallback_view else {
            return Err(self.storage(err));
        };
        tracing::warn!(entity = self.entity.label, error = %err, "lookup query failed, using fallback");
        list_query(self.entity, fallback, user, parent)
            .build_query_scalar::<Value>()
            .fetch_all(&pool)
            .await
            .map_err(|e| self.storage(e))
    }

    pub async fn get(&self, user: &AuthenticatedUser, id: Uuid) -> AppResult<Value> {
        let pool = self.pool().await?;
        let row = self
            .fetch_view(&pool, id)
            .await?
            .ok_or_else(|| self.entity.not_found())?;
        self.ensure_owner(&row, user)?;
        Ok(row)
    }

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        mut body: Map<String, Value>,
    ) -> AppResult<Value> {
        if let Some(prepare) = self.entity.prepare {
            prepare(&mut body, None);
        }
        let values = self.entity.collect(&body, WriteMode::Create)?;

        let pool = self.pool().await?;
        self.ensure_identity(&pool, user).await?;
        self.check_references(&pool, &values, None).await?;

        let id = insert_query(self.entity, values, user.user_id)
            .build_query_scalar::<Uuid>()
            .fetch_one(&pool)
            .await
            .map_err(|e| self.storage(e))?;
        tracing::info!(entity = self.entity.label, %id, user_id = %user.user_id, "created");

        self.fetch_view(&pool, id)
            .await?
            .ok_or_else(|| self.entity.not_found())
    }

    /// Partial update: only fields present in `body` are written.
    pub async fn update(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        mut body: Map<String, Value>,
    ) -> AppResult<Value> {
        let pool = self.pool().await?;
        let stored = self
            .fetch_stored(&pool, id)
            .await?
            .ok_or_else(|| self.entity.not_found())?;
        self.ensure_owner(&stored, user)?;

        if let Some(prepare) = self.entity.prepare {
            prepare(&mut body, Some(&stored));
        }
        let values = self.entity.collect(&body, WriteMode::Update)?;
        self.check_references(&pool, &values, Some(&stored)).await?;

        let result = update_query(self.entity, id, values)
            .build()
            .execute(&pool)
            .await
            .map_err(|e| self.storage(e))?;
        if result.rows_affected() == 0 {
            return Err(self.entity.not_found());
        }
        tracing::info!(entity = self.entity.label, %id, user_id = %user.user_id, "updated");

        self.fetch_view(&pool, id)
            .await?
            .ok_or_else(|| self.entity.not_found())
    }

    pub async fn delete(&self, user: &AuthenticatedUser, id: Uuid) -> AppResult<Value> {
        let pool = self.pool().await?;

        if self.entity.restricts(user) {
            let stored = self
                .fetch_stored(&pool, id)
                .await?
                .ok_or_else(|| self.entity.not_found())?;
            self.ensure_owner(&stored, user)?;
        }

        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.entity.table))
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| self.storage(e))?;
        if result.rows_affected() == 0 {
            return Err(self.entity.not_found());
        }
        tracing::info!(entity = self.entity.label, %id, user_id = %user.user_id, "deleted");

        Ok(json!({ "message": format!("{} deleted successfully", self.entity.label) }))
    }

    async fn pool(&self) -> AppResult<PgPool> {
        self.db.acquire().await.map_err(AppError::Storage)
    }

    fn storage(&self, err: sqlx::Error) -> AppError {
        AppError::Storage(self.db.report(err))
    }

    /// One row through the lookup view, degrading to the fallback view like `list`. A write
    /// has already committed when this runs after create or update.
    async fn fetch_view(&self, pool: &PgPool, id: Uuid) -> AppResult<Option<Value>> {
        let err = match fetch_one_through(pool, self.entity.view, id).await {
            Ok(row) => return Ok(row),
            Err(err) => err,
        };

        let Some(fallback) = self.entity.fallback_view else {
            return Err(self.storage(err));
        };
        tracing::warn!(entity = self.entity.label, %id, error = %err, "lookup query failed, using fallback");
        fetch_one_through(pool, fallback, id)
            .await
            .map_err(|e| self.storage(e))
    }

    /// The bare table row, used for ownership and stored parent values.
    async fn fetch_stored(&self, pool: &PgPool, id: Uuid) -> AppResult<Option<Value>> {
        sqlx::query_scalar::<_, Value>(&format!(
            "SELECT to_jsonb(t) FROM {} t WHERE t.id = $1",
            self.entity.table
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| self.storage(e))
    }

    fn ensure_owner(&self, row: &Value, user: &AuthenticatedUser) -> AppResult<()> {
        if self.entity.restricts(user) && !self.entity.is_owned_by(row, user) {
            tracing::warn!(entity = self.entity.label, user_id = %user.user_id, "ownership check failed");
            return Err(AppError::Forbidden(format!(
                "Access denied. You can only manage your own {}",
                self.entity.path
            )));
        }
        Ok(())
    }

    /// A valid token may still name a user that no longer exists.
    async fn ensure_identity(&self, pool: &PgPool, user: &AuthenticatedUser) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user.user_id)
            .fetch_one(pool)
            .await
            .map_err(|e| self.storage(e))?;
        if !exists {
            tracing::warn!(user_id = %user.user_id, "token references unknown user");
            return Err(AppError::UnknownIdentity(user.user_id));
        }
        Ok(())
    }

    async fn check_references(
        &self,
        pool: &PgPool,
        values: &[(&Field, SqlValue)],
        stored: Option<&Value>,
    ) -> AppResult<()> {
        for reference in self.entity.references {
            let Some((id, scope_value)) = reference_target(reference, values, stored) else {
                continue;
            };

            let mut query = QueryBuilder::<Postgres>::new(format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ",
                reference.table
            ));
            query.push_bind(id);
            if let (Some(scope), Some(parent)) = (reference.within, scope_value) {
                query.push(format!(" AND {} = ", scope.column)).push_bind(parent);
            }
            query.push(")");

            let exists = query
                .build_query_scalar::<bool>()
                .fetch_one(pool)
                .await
                .map_err(|e| self.storage(e))?;
            if !exists {
                tracing::warn!(entity = self.entity.label, field = reference.field, %id, "invalid reference");
                return Err(AppError::InvalidReference(reference.not_found_message()));
            }
        }
        Ok(())
    }
}

/// The id to check for `reference`, plus the parent it must belong to when scoped.
///
/// A reference is checked when it is written, or when its scope field is written and the
/// stored row already points somewhere.
fn reference_target(
    reference: &Reference,
    values: &[(&Field, SqlValue)],
    stored: Option<&Value>,
) -> Option<(Uuid, Option<Uuid>)> {
    let supplied = |name: &str| values.iter().find(|(f, _)| f.name == name).map(|(_, v)| v);
    let stored_uuid = |name: &str| {
        stored
            .and_then(|row| row.get(name))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Uuid>().ok())
    };

    let scope_supplied = reference
        .within
        .is_some_and(|scope| supplied(scope.field).is_some());

    let id = match supplied(reference.field) {
        Some(value) => value.as_uuid()?,
        None if scope_supplied => stored_uuid(reference.field)?,
        None => return None,
    };

    let parent = reference.within.and_then(|scope| match supplied(scope.field) {
        Some(value) => value.as_uuid(),
        None => stored_uuid(scope.field),
    });
    Some((id, parent))
}

async fn fetch_one_through(pool: &PgPool, view: &str, id: Uuid) -> Result<Option<Value>, sqlx::Error> {
    sqlx::query_scalar::<_, Value>(&format!("SELECT to_jsonb(q) FROM ({view}) q WHERE q.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

fn push_value(query: &mut QueryBuilder<'_, Postgres>, value: SqlValue) {
    match value {
        SqlValue::Text(v) => query.push_bind(v),
        SqlValue::Integer(v) => query.push_bind(v),
        SqlValue::Uuid(v) => query.push_bind(v),
        SqlValue::Date(v) => query.push_bind(v),
        SqlValue::Timestamp(v) => query.push_bind(v),
    };
}

fn list_query<'a>(
    entity: &EntityDescriptor,
    view: &str,
    user: &AuthenticatedUser,
    parent: Option<Uuid>,
) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT to_jsonb(q) FROM ({view}) q WHERE TRUE"));
    if let (Some(column), Some(parent)) = (entity.parent_filter, parent) {
        query.push(format!(" AND q.{column} = ")).push_bind(parent);
    }
    if entity.restricts(user) {
        query
            .push(format!(" AND q.{} = ", entity.owner_column))
            .push_bind(user.user_id);
    }
    query.push(format!(" ORDER BY q.{}", entity.order_by));
    query
}

fn insert_query<'a>(
    entity: &EntityDescriptor,
    values: Vec<(&Field, SqlValue)>,
    owner: Uuid,
) -> QueryBuilder<'a, Postgres> {
    let mut columns: Vec<&str> = values.iter().map(|(f, _)| f.name).collect();
    columns.push(entity.owner_column);

    let mut query = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES (",
        entity.table,
        columns.join(", ")
    ));
    for (_, value) in values {
        push_value(&mut query, value);
        query.push(", ");
    }
    query.push_bind(owner);
    query.push(") RETURNING id");
    query
}

fn update_query<'a>(
    entity: &EntityDescriptor,
    id: Uuid,
    values: Vec<(&Field, SqlValue)>,
) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new(format!("UPDATE {} SET ", entity.table));
    for (field, value) in values {
        if field.defaulted && value.is_null() {
            query.push(format!("{} = DEFAULT, ", field.name));
            continue;
        }
        query.push(format!("{} = ", field.name));
        push_value(&mut query, value);
        query.push(", ");
    }
    query.push("updated_at = NOW() WHERE id = ");
    query.push_bind(id);
    query
}
