pub mod artifact;
pub mod classifier;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod preprocessing;
pub mod routes;
pub mod schema;
