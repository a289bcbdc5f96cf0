use crate::models::entity::{
    AccessPolicy, EntityDescriptor, Field, FieldKind, Reference, ADMIN_ONLY,
};

pub static SUBJECTS: EntityDescriptor = EntityDescriptor {
    label: "Subject",
    path: "subjects",
    table: "subjects",
    fields: &[
        Field::text("name").required(),
        Field::text("description"),
        Field::new("sub_category_id", FieldKind::Uuid).required().fixed(),
        Field::text("status").defaulted(),
    ],
    references: &[Reference::new("sub_category_id", "sub_categories", "SubCategory")],
    owner_column: "created_by",
    owner_scoped: &[],
    access: AccessPolicy {
        read: ADMIN_ONLY,
        create: ADMIN_ONLY,
        modify: ADMIN_ONLY,
    },
    view: r#"
        SELECT s.*,
               sc.name AS sub_category_name,
               c.name AS category_name,
               u.name AS created_by_name,
               (SELECT COUNT(*) FROM topics t
                 WHERE t.subject_id = s.id AND t.status = 'Active') AS topics_count
          FROM subjects s
          LEFT JOIN sub_categories sc ON s.sub_category_id = sc.id
          LEFT JOIN categories c ON sc.category_id = c.id
          LEFT JOIN users u ON s.created_by = u.id"#,
    fallback_view: None,
    parent_filter: Some("sub_category_id"),
    order_by: "name ASC",
    prepare: None,
};
