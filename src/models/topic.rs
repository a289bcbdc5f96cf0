use crate::models::entity::{
    AccessPolicy, EntityDescriptor, Field, FieldKind, Reference, ADMIN_ONLY,
};

pub static TOPICS: EntityDescriptor = EntityDescriptor {
    label: "Topic",
    path: "topics",
    table: "topics",
    fields: &[
        Field::text("name").required(),
        Field::text("description"),
        Field::new("subject_id", FieldKind::Uuid).required().fixed(),
        Field::text("status").defaulted(),
    ],
    references: &[Reference::new("subject_id", "subjects", "Subject")],
    owner_column: "created_by",
    owner_scoped: &[],
    access: AccessPolicy {
        read: ADMIN_ONLY,
        create: ADMIN_ONLY,
        modify: ADMIN_ONLY,
    },
    view: r#"
        SELECT t.*,
               s.name AS subject_name,
               sc.name AS sub_category_name,
               c.name AS category_name,
               u.name AS created_by_name
          FROM topics t
          LEFT JOIN subjects s ON t.subject_id = s.id
          LEFT JOIN sub_categories sc ON s.sub_category_id = sc.id
          LEFT JOIN categories c ON sc.category_id = c.id
          LEFT JOIN users u ON t.created_by = u.id"#,
    fallback_view: None,
    parent_filter: Some("subject_id"),
    order_by: "name ASC",
    prepare: None,
};
