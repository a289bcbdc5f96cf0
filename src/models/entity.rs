//! Descriptor types for the CRUD entities.
//!
//! Every resource under `/api/*` is served by the same repository and handlers; what differs
//! between them (table, writable fields, parent references, ownership, access policy, the
//! lookup view used for reads) is described by one static [`EntityDescriptor`] per entity.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{auth::AuthenticatedUser, user::UserRole},
};

pub const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Uuid,
    Date,
    Timestamp,
}

/// A decoded request value, typed for binding. `None` binds SQL NULL of the right type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Integer(Option<i32>),
    Uuid(Option<Uuid>),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        match self {
            SqlValue::Text(v) => v.is_none(),
            SqlValue::Integer(v) => v.is_none(),
            SqlValue::Uuid(v) => v.is_none(),
            SqlValue::Date(v) => v.is_none(),
            SqlValue::Timestamp(v) => v.is_none(),
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            SqlValue::Uuid(v) => *v,
            _ => None,
        }
    }
}

impl FieldKind {
    fn null(self) -> SqlValue {
        match self {
            FieldKind::Text => SqlValue::Text(None),
            FieldKind::Integer => SqlValue::Integer(None),
            FieldKind::Uuid => SqlValue::Uuid(None),
            FieldKind::Date => SqlValue::Date(None),
            FieldKind::Timestamp => SqlValue::Timestamp(None),
        }
    }

    /// Decode a JSON value for a column of this kind. JSON null and the empty string both
    /// decode to NULL.
    pub fn decode(self, field: &str, value: &Value) -> Result<SqlValue, AppError> {
        let bad = |expected: &str| AppError::BadRequest(format!("Field '{field}' must be {expected}"));

        match value {
            Value::Null => return Ok(self.null()),
            Value::String(s) if s.trim().is_empty() => return Ok(self.null()),
            _ => {}
        }

        match self {
            FieldKind::Text => match value {
                Value::String(s) => Ok(SqlValue::Text(Some(s.clone()))),
                _ => Err(bad("a string")),
            },
            FieldKind::Integer => {
                let n = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                n.and_then(|n| i32::try_from(n).ok())
                    .map(|n| SqlValue::Integer(Some(n)))
                    .ok_or_else(|| bad("an integer"))
            }
            FieldKind::Uuid => value
                .as_str()
                .and_then(|s| s.trim().parse::<Uuid>().ok())
                .map(|id| SqlValue::Uuid(Some(id)))
                .ok_or_else(|| bad("a valid id")),
            FieldKind::Date => value
                .as_str()
                .and_then(parse_date)
                .map(|d| SqlValue::Date(Some(d)))
                .ok_or_else(|| bad("a date (YYYY-MM-DD)")),
            FieldKind::Timestamp => value
                .as_str()
                .and_then(parse_timestamp)
                .map(|t| SqlValue::Timestamp(Some(t)))
                .ok_or_else(|| bad("a date or date-time")),
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|t| t.date_naive()))
}

/// RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS[.f]]` (taken as UTC), or a bare date at midnight.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// A writable column.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Must be present (and non-empty) on create; may not be cleared on update.
    pub required: bool,
    /// Accepted by update. Parent links of the content hierarchy are fixed at creation.
    pub updatable: bool,
    /// NOT NULL column with a default; clearing it on update restores the default.
    pub defaulted: bool,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            updatable: true,
            defaulted: false,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn defaulted(self) -> Self {
        Self {
            defaulted: true,
            ..self
        }
    }

    pub const fn fixed(self) -> Self {
        Self {
            updatable: false,
            ..self
        }
    }
}

/// A field pointing at a row of another table, checked for existence before any write.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub field: &'static str,
    pub table: &'static str,
    pub label: &'static str,
    pub within: Option<Scope>,
}

/// The referenced row must also carry `column = <value of field>`, e.g. a course's
/// sub-category must belong to the course's category.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    pub column: &'static str,
    pub field: &'static str,
    pub label: &'static str,
}

impl Reference {
    pub const fn new(field: &'static str, table: &'static str, label: &'static str) -> Self {
        Self {
            field,
            table,
            label,
            within: None,
        }
    }

    pub fn not_found_message(&self) -> String {
        match &self.within {
            Some(scope) => format!(
                "{} not found or does not belong to the selected {}",
                self.label, scope.label
            ),
            None => format!("{} not found", self.label),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    pub read: &'static [UserRole],
    pub create: &'static [UserRole],
    pub modify: &'static [UserRole],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

pub struct EntityDescriptor {
    /// Singular display name used in messages ("Category").
    pub label: &'static str,
    /// Path segment under `/api`.
    pub path: &'static str,
    pub table: &'static str,
    pub fields: &'static [Field],
    pub references: &'static [Reference],
    /// Column holding the creator/author/mentor, filled from the caller's token.
    pub owner_column: &'static str,
    /// Roles that may only see and modify rows they own.
    pub owner_scoped: &'static [UserRole],
    pub access: AccessPolicy,
    /// Read query with lookups; wrapped as a subquery, so its columns are filtered and
    /// ordered by name.
    pub view: &'static str,
    /// Degraded read query used by `list` when `view` fails.
    pub fallback_view: Option<&'static str>,
    /// Query-string parameter (and view column) that narrows `list` to one parent.
    pub parent_filter: Option<&'static str>,
    pub order_by: &'static str,
    /// Normalises the request body before decoding. Receives the stored row on update.
    pub prepare: Option<fn(&mut Map<String, Value>, Option<&Value>)>,
}

impl std::fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("label", &self.label)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl EntityDescriptor {
    pub fn restricts(&self, user: &AuthenticatedUser) -> bool {
        user.has_role(self.owner_scoped)
    }

    /// Whether `row` (as returned by the view or the base table) belongs to `user`.
    pub fn is_owned_by(&self, row: &Value, user: &AuthenticatedUser) -> bool {
        row.get(self.owner_column)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Uuid>().ok())
            == Some(user.user_id)
    }

    pub fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", self.label))
    }

    fn missing_message(&self) -> String {
        let names: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        let mut message = names.join(" and ");
        if let Some(first) = message.get(..1) {
            message = first.to_uppercase() + &message[1..];
        }
        if names.len() > 1 {
            format!("{message} are required")
        } else {
            format!("{message} is required")
        }
    }

    /// Decode the writable fields of `body` for `mode`.
    ///
    /// Create: every required field must be present and non-empty; absent optional fields are
    /// left to column defaults. Update: only fields present in the body are returned, so
    /// anything omitted keeps its stored value.
    pub fn collect(
        &self,
        body: &Map<String, Value>,
        mode: WriteMode,
    ) -> Result<Vec<(&Field, SqlValue)>, AppError> {
        let mut values = Vec::new();
        for field in self.fields {
            if mode == WriteMode::Update && !field.updatable {
                continue;
            }
            let Some(raw) = body.get(field.name) else {
                if mode == WriteMode::Create && field.required {
                    return Err(AppError::MissingField(self.missing_message()));
                }
                continue;
            };
            let value = field.kind.decode(field.name, raw)?;
            if field.required && value.is_null() {
                return Err(match mode {
                    WriteMode::Create => AppError::MissingField(self.missing_message()),
                    WriteMode::Update => {
                        AppError::MissingField(format!("{} cannot be empty", field.name))
                    }
                });
            }
            if mode == WriteMode::Create && value.is_null() {
                continue;
            }
            values.push((field, value));
        }
        Ok(values)
    }
}
