//! Schema data structures
//!
//! A `SchemaMap` is the best-effort view of a database used to ground the
//! model's translation: entity (table or collection) name to field names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from table/collection name to its field names
///
/// Built fresh per request. Field order is whatever the backend metadata
/// (or the sampled document) reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaMap {
    entities: BTreeMap<String, Vec<String>>,
}

impl SchemaMap {
    /// Create an empty schema map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an entity and its fields
    pub fn insert(&mut self, entity: impl Into<String>, fields: Vec<String>) {
        self.entities.insert(entity.into(), fields);
    }

    /// Field names of an entity, if known
    pub fn fields(&self, entity: &str) -> Option<&[String]> {
        self.entities.get(entity).map(Vec::as_slice)
    }

    /// All entity names
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(String::as_str).collect()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Format the schema for inclusion in an LLM prompt (pretty JSON)
    pub fn format_for_llm(&self) -> String {
        serde_json::to_string_pretty(&self.entities).unwrap_or_else(|_| "{}".to_string())
    }
}

impl FromIterator<(String, Vec<String>)> for SchemaMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for SchemaMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_for_llm())
    }
}
