pub mod config;
pub mod database;
pub mod http;
pub mod models;
pub mod repositories;
pub mod schema;
