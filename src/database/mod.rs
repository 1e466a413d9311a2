//! Database module
//!
//! Backend kinds and the capability trait, schema maps, structured queries,
//! the MySQL and MongoDB backends, and the result cache.

pub mod cache;
pub mod connection;
pub mod mongo;
pub mod mysql;
pub mod query;
pub mod schema;

// Re-exports
pub use cache::{cache_key, RedisStore, ResultCache, SharedStore};
pub use connection::{DatabaseBackend, QueryBackend};
pub use query::{DocumentQuery, Record, ResultSet, StructuredQuery};
pub use schema::SchemaMap;
