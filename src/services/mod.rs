pub mod auth;
pub mod repository;
pub mod token;
