//! Database backend abstraction
//!
//! This module provides the backend kind enum and the capability trait that
//! every live backend (MySQL, MongoDB) implements.

use crate::database::query::{ResultSet, StructuredQuery};
use crate::database::schema::SchemaMap;
use crate::error::{QueryForgeError, Result};
use async_trait::async_trait;
use std::str::FromStr;

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackend {
    /// MySQL/MariaDB (relational)
    MySQL,
    /// MongoDB (document store)
    MongoDB,
}

impl DatabaseBackend {
    /// All backend kinds, in a stable order
    pub const ALL: [DatabaseBackend; 2] = [DatabaseBackend::MySQL, DatabaseBackend::MongoDB];

    /// Canonical lowercase name, as used in requests and cache keys
    pub fn name(&self) -> &'static str {
        match self {
            DatabaseBackend::MySQL => "mysql",
            DatabaseBackend::MongoDB => "mongodb",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            DatabaseBackend::MySQL => "MySQL",
            DatabaseBackend::MongoDB => "MongoDB",
        }
    }

    /// Prompt fragment telling the model what shape of query to emit
    pub fn translation_hint(&self) -> &'static str {
        match self {
            DatabaseBackend::MySQL => {
                "Return the MySQL statement as plain text."
            }
            DatabaseBackend::MongoDB => {
                "Return a single strict JSON object (double-quoted keys and strings, no comments, \
                no shell or Python syntax) of the form \
                {\"find\": \"<collection>\", \"filter\": {...}} or \
                {\"aggregate\": \"<collection>\", \"pipeline\": [...]}."
            }
        }
    }

    /// Parse a (fence-stripped) model reply into an executable query
    pub fn parse_reply(&self, reply: &str) -> Result<StructuredQuery> {
        match self {
            DatabaseBackend::MySQL => StructuredQuery::parse_sql(reply),
            DatabaseBackend::MongoDB => StructuredQuery::parse_document(reply),
        }
    }
}

impl FromStr for DatabaseBackend {
    type Err = QueryForgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseBackend::MySQL),
            "mongodb" | "mongo" => Ok(DatabaseBackend::MongoDB),
            _ => Err(QueryForgeError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Capability set every live backend provides
///
/// Adding a new kind of database means adding a `DatabaseBackend` variant and
/// one implementation of this trait.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// The kind of backend this is
    fn kind(&self) -> DatabaseBackend;

    /// Build a best-effort map of entity name to field names from live metadata
    async fn introspect(&self) -> Result<SchemaMap>;

    /// Run a structured query and materialize every result record
    async fn execute(&self, query: &StructuredQuery) -> Result<ResultSet>;

    /// Cheap round-trip to check the backend is reachable
    async fn ping(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("mysql".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::MySQL);
        assert_eq!("MySQL".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::MySQL);
        assert_eq!("mongodb".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::MongoDB);
        assert_eq!("MongoDB".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::MongoDB);
        assert_eq!("mongo".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::MongoDB);
    }

    #[test]
    fn test_unsupported_backend() {
        let err = "postgres".parse::<DatabaseBackend>().unwrap_err();
        assert!(matches!(err, QueryForgeError::UnsupportedBackend(ref s) if s == "postgres"));
        assert!("".parse::<DatabaseBackend>().is_err());
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(DatabaseBackend::MySQL.name(), "mysql");
        assert_eq!(DatabaseBackend::MongoDB.name(), "mongodb");
        assert_eq!(DatabaseBackend::MySQL.to_string(), "MySQL");
    }

    #[test]
    fn test_parse_reply_dispatch() {
        let query = DatabaseBackend::MySQL.parse_reply("SELECT 1").unwrap();
        assert!(matches!(query, StructuredQuery::Sql(ref sql) if sql == "SELECT 1"));

        let query = DatabaseBackend::MongoDB
            .parse_reply(r#"{"find": "users"}"#)
            .unwrap();
        assert!(matches!(query, StructuredQuery::Document(_)));
    }
}
