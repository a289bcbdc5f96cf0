use crate::models::entity::{AccessPolicy, EntityDescriptor, Field, FieldKind, ADMIN_ONLY};

pub static BATCHES: EntityDescriptor = EntityDescriptor {
    label: "Batch",
    path: "batches",
    table: "batches",
    fields: &[
        Field::text("name").required(),
        Field::text("description"),
        Field::new("start_date", FieldKind::Date).required(),
        Field::new("end_date", FieldKind::Date),
        Field::new("capacity", FieldKind::Integer).defaulted(),
        Field::text("status").defaulted(),
    ],
    references: &[],
    owner_column: "created_by",
    owner_scoped: &[],
    access: AccessPolicy {
        read: ADMIN_ONLY,
        create: ADMIN_ONLY,
        modify: ADMIN_ONLY,
    },
    view: r#"
        SELECT b.*,
               u.name AS created_by_name,
               (SELECT COUNT(*) FROM batch_enrollments e
                 WHERE e.batch_id = b.id AND e.status = 'Active') AS enrolled_count
          FROM batches b
          LEFT JOIN users u ON b.created_by = u.id"#,
    fallback_view: None,
    parent_filter: None,
    order_by: "start_date DESC",
    prepare: None,
};
