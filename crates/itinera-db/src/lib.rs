//! PostgreSQL persistence for itinera: schema, row models, pool, queries.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
