use crate::models::{
    entity::{AccessPolicy, EntityDescriptor, Field, FieldKind, Reference},
    user::UserRole,
};

const MENTOR_ONLY: &[UserRole] = &[UserRole::Mentor];

pub static MODULES: EntityDescriptor = EntityDescriptor {
    label: "Module",
    path: "modules",
    table: "modules",
    fields: &[
        Field::text("title").required(),
        Field::text("description"),
        Field::text("content"),
        Field::new("course_id", FieldKind::Uuid),
        Field::new("duration", FieldKind::Integer),
        Field::new("order_number", FieldKind::Integer).defaulted(),
        Field::text("status").defaulted(),
    ],
    references: &[Reference::new("course_id", "courses", "Course")],
    owner_column: "mentor_id",
    owner_scoped: MENTOR_ONLY,
    access: AccessPolicy {
        read: UserRole::ALL,
        create: MENTOR_ONLY,
        modify: MENTOR_ONLY,
    },
    view: r#"
        SELECT m.*,
               u.name AS mentor_name
          FROM modules m
          LEFT JOIN users u ON m.mentor_id = u.id"#,
    fallback_view: None,
    parent_filter: None,
    order_by: "created_at DESC",
    prepare: None,
};
