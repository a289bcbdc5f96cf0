use crate::models::entity::{
    AccessPolicy, EntityDescriptor, Field, FieldKind, Reference, ADMIN_ONLY,
};

pub static SUB_CATEGORIES: EntityDescriptor = EntityDescriptor {
    label: "SubCategory",
    path: "subcategories",
    table: "sub_categories",
    fields: &[
        Field::text("name").required(),
        Field::text("description"),
        Field::new("category_id", FieldKind::Uuid).required().fixed(),
        Field::text("status").defaulted(),
    ],
    references: &[Reference::new("category_id", "categories", "Category")],
    owner_column: "created_by",
    owner_scoped: &[],
    access: AccessPolicy {
        read: ADMIN_ONLY,
        create: ADMIN_ONLY,
        modify: ADMIN_ONLY,
    },
    view: r#"
        SELECT sc.*,
               c.name AS category_name,
               u.name AS created_by_name,
               (SELECT COUNT(*) FROM subjects s
                 WHERE s.sub_category_id = sc.id AND s.status = 'Active') AS subjects_count,
               (SELECT COUNT(*) FROM topics t
                  JOIN subjects s ON t.subject_id = s.id
                 WHERE s.sub_category_id = sc.id AND t.status = 'Active') AS topics_count
          FROM sub_categories sc
          LEFT JOIN categories c ON sc.category_id = c.id
          LEFT JOIN users u ON sc.created_by = u.id"#,
    fallback_view: None,
    parent_filter: Some("category_id"),
    order_by: "name ASC",
    prepare: None,
};
