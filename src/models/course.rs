use crate::models::{
    entity::{AccessPolicy, EntityDescriptor, Field, FieldKind, Reference, Scope},
    user::UserRole,
};

const AUTHORS: &[UserRole] = &[UserRole::Admin, UserRole::Mentor, UserRole::Tutor];

pub static COURSES: EntityDescriptor = EntityDescriptor {
    label: "Course",
    path: "courses",
    table: "courses",
    fields: &[
        Field::text("title").required(),
        Field::text("description"),
        Field::text("thumbnail"),
        Field::new("category_id", FieldKind::Uuid).required(),
        Field::new("sub_category_id", FieldKind::Uuid),
        Field::text("status").defaulted(),
    ],
    references: &[
        Reference::new("category_id", "categories", "Category"),
        Reference {
            field: "sub_category_id",
            table: "sub_categories",
            label: "SubCategory",
            within: Some(Scope {
                column: "category_id",
                field: "category_id",
                label: "category",
            }),
        },
    ],
    owner_column: "author_id",
    owner_scoped: &[UserRole::Mentor, UserRole::Tutor],
    access: AccessPolicy {
        read: UserRole::ALL,
        create: AUTHORS,
        modify: AUTHORS,
    },
    // Shaped for the course catalogue screens.
    view: r#"
        SELECT c.id,
               c.title,
               c.description,
               c.thumbnail,
               COALESCE(cat.name, '') AS category,
               c.category_id,
               COALESCE(sc.name, '') AS "subCategory",
               c.sub_category_id,
               to_char(c.created_at, 'YYYY-MM-DD') AS "creationDate",
               c.enrollments_count AS enrollments,
               c.status,
               COALESCE(u.name, '') AS author,
               c.author_id,
               c.created_at,
               c.updated_at
          FROM courses c
          LEFT JOIN categories cat ON c.category_id = cat.id
          LEFT JOIN sub_categories sc ON c.sub_category_id = sc.id
          LEFT JOIN users u ON c.author_id = u.id"#,
    fallback_view: None,
    parent_filter: None,
    order_by: "created_at DESC",
    prepare: None,
};
