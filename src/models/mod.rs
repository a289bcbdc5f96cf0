pub mod auth;
pub mod batch;
pub mod category;
pub mod course;
pub mod entity;
pub mod module;
pub mod session;
pub mod sub_category;
pub mod subject;
pub mod topic;
pub mod user;

use entity::EntityDescriptor;

/// Every resource served under `/api/{path}`.
pub static ENTITIES: [&EntityDescriptor; 8] = [
    &category::CATEGORIES,
    &sub_category::SUB_CATEGORIES,
    &subject::SUBJECTS,
    &topic::TOPICS,
    &batch::BATCHES,
    &session::SESSIONS,
    &module::MODULES,
    &course::COURSES,
];
