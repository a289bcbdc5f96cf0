use crate::models::entity::{AccessPolicy, EntityDescriptor, Field, ADMIN_ONLY};

pub static CATEGORIES: EntityDescriptor = EntityDescriptor {
    label: "Category",
    path: "categories",
    table: "categories",
    fields: &[
        Field::text("name").required(),
        Field::text("description"),
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
        SELECT c.*,
               u.name AS created_by_name,
               (SELECT COUNT(*) FROM sub_categories sc
                 WHERE sc.category_id = c.id AND sc.status = 'Active') AS "subCategories_count",
               (SELECT COUNT(*) FROM subjects s
                  JOIN sub_categories sc ON s.sub_category_id = sc.id
                 WHERE sc.category_id = c.id AND s.status = 'Active') AS subjects_count,
               (SELECT COUNT(*) FROM topics t
                  JOIN subjects s ON t.subject_id = s.id
                  JOIN sub_categories sc ON s.sub_category_id = sc.id
                 WHERE sc.category_id = c.id AND t.status = 'Active') AS topics_count
          FROM categories c
          LEFT JOIN users u ON c.created_by = u.id"#,
    // Without the hierarchy tables the counts are reported as zero.
    fallback_view: Some(
        r#"
        SELECT c.*,
               u.name AS created_by_name,
               0 AS "subCategories_count",
               0 AS subjects_count,
               0 AS topics_count
          FROM categories c
          LEFT JOIN users u ON c.created_by = u.id"#,
    ),
    parent_filter: None,
    order_by: "name ASC",
    prepare: None,
};
