//! Accès PostgreSQL: pool, schéma et store

pub mod pool;
pub mod schema;
pub mod store;
