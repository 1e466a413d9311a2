//! Structured queries and result sets
//!
//! This module turns the model's (already fence-stripped) reply into an
//! executable query. Document-store replies are parsed with a strict JSON
//! parser only; nothing in the reply is ever evaluated.

use crate::error::{QueryForgeError, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// One result row/document: field name to value, in backend order
pub type Record = Map<String, Value>;

/// Ordered sequence of result records
pub type ResultSet = Vec<Record>;

/// Error text used for document queries the executor cannot dispatch
pub const UNSUPPORTED_COMMAND: &str = "unsupported command";

/// Executable representation of the model's output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredQuery {
    /// Raw relational query text, run as-is
    Sql(String),
    /// Document-store command
    Document(DocumentQuery),
}

/// Document-store command understood by the executor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentQuery {
    /// `{"find": <collection>, "filter": {...}}`
    Find { collection: String, filter: Record },
    /// `{"aggregate": <collection>, "pipeline": [{...}, ...]}`
    Aggregate {
        collection: String,
        pipeline: Vec<Record>,
    },
    /// Anything else; answered with an error record instead of failing
    Unsupported(Value),
}

impl StructuredQuery {
    /// Relational replies are taken verbatim (trimmed)
    pub fn parse_sql(reply: &str) -> Result<Self> {
        let sql = reply.trim();
        if sql.is_empty() {
            return Err(QueryForgeError::translation("model returned an empty query", Some(reply)));
        }
        Ok(StructuredQuery::Sql(sql.to_string()))
    }

    /// Document replies must be JSON; anything else is a translation error
    pub fn parse_document(reply: &str) -> Result<Self> {
        let text = reply.trim();
        let value: Value = serde_json::from_str(text).map_err(|e| {
            QueryForgeError::translation(format!("Error parsing MongoDB query: {}", e), Some(text))
        })?;
        Ok(StructuredQuery::Document(DocumentQuery::from_value(value)))
    }

    /// Short description for logs
    pub fn summary(&self) -> String {
        match self {
            StructuredQuery::Sql(sql) => sql.clone(),
            StructuredQuery::Document(doc) => doc.to_value().to_string(),
        }
    }
}

impl DocumentQuery {
    /// Classify a parsed JSON value as a find/aggregate command
    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = &value else {
            return DocumentQuery::Unsupported(value);
        };

        if let Some(target) = map.get("find") {
            let filter = match map.get("filter") {
                None | Some(Value::Null) => Some(Record::new()),
                Some(Value::Object(filter)) => Some(filter.clone()),
                Some(_) => None,
            };
            if let (Value::String(collection), Some(filter)) = (target, filter) {
                return DocumentQuery::Find {
                    collection: collection.clone(),
                    filter,
                };
            }
        } else if let Some(target) = map.get("aggregate") {
            let pipeline = match map.get("pipeline") {
                None | Some(Value::Null) => Some(Vec::new()),
                Some(Value::Array(stages)) => stages
                    .iter()
                    .map(|stage| stage.as_object().cloned())
                    .collect::<Option<Vec<_>>>(),
                Some(_) => None,
            };
            if let (Value::String(collection), Some(pipeline)) = (target, pipeline) {
                return DocumentQuery::Aggregate {
                    collection: collection.clone(),
                    pipeline,
                };
            }
        }

        DocumentQuery::Unsupported(value)
    }

    /// The command as JSON, in the shape the model is asked to emit
    pub fn to_value(&self) -> Value {
        match self {
            DocumentQuery::Find { collection, filter } => {
                json!({ "find": collection, "filter": filter })
            }
            DocumentQuery::Aggregate {
                collection,
                pipeline,
            } => json!({ "aggregate": collection, "pipeline": pipeline }),
            DocumentQuery::Unsupported(value) => value.clone(),
        }
    }
}

/// Result set returned for a document command the executor does not support
pub fn unsupported_command_result(query: &Value) -> ResultSet {
    let mut record = Record::new();
    record.insert("error".to_string(), Value::String(UNSUPPORTED_COMMAND.to_string()));
    record.insert("query".to_string(), query.clone());
    vec![record]
}
