//! MongoDB backend
//!
//! Introspection samples one document per collection; execution dispatches
//! on the parsed `find` / `aggregate` command.

use crate::database::connection::{DatabaseBackend, QueryBackend};
use crate::database::query::{
    unsupported_command_result, DocumentQuery, Record, ResultSet, StructuredQuery,
};
use crate::database::schema::SchemaMap;
use crate::error::{QueryForgeError, Result};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::{debug, warn};

/// MongoDB backend bound to one database
pub struct MongoBackend {
    db: Database,
}

impl MongoBackend {
    /// Create a client for `uri` and bind to `database`
    ///
    /// The driver connects in the background; unreachable servers surface
    /// as `Connectivity` errors once a request needs them.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| QueryForgeError::Config(format!("Invalid MongoDB URI: {}", e)))?;
        Ok(Self {
            db: client.database(database),
        })
    }

    /// Wrap an existing database handle
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    async fn find(&self, collection: &str, filter: &Record) -> Result<ResultSet> {
        let filter = to_bson_document(filter)?;
        let cursor = self
            .db
            .collection::<Document>(collection)
            .find(filter)
            .await
            .map_err(classify)?;
        collect(cursor).await
    }

    async fn aggregate(&self, collection: &str, pipeline: &[Record]) -> Result<ResultSet> {
        let stages = pipeline
            .iter()
            .map(to_bson_document)
            .collect::<Result<Vec<_>>>()?;
        let cursor = self
            .db
            .collection::<Document>(collection)
            .aggregate(stages)
            .await
            .map_err(classify)?;
        collect(cursor).await
    }
}

#[async_trait]
impl QueryBackend for MongoBackend {
    fn kind(&self) -> DatabaseBackend {
        DatabaseBackend::MongoDB
    }

    async fn introspect(&self) -> Result<SchemaMap> {
        let names = self
            .db
            .list_collection_names()
            .await
            .map_err(connectivity)?;

        let mut schema = SchemaMap::new();
        for name in names {
            let sample = self
                .db
                .collection::<Document>(&name)
                .find_one(doc! {})
                .await
                .map_err(connectivity)?;
            schema.insert(name, fields_from_sample(sample.as_ref()));
        }
        debug!(collections = schema.len(), "introspected MongoDB schema");
        Ok(schema)
    }

    async fn execute(&self, query: &StructuredQuery) -> Result<ResultSet> {
        let StructuredQuery::Document(command) = query else {
            return Err(QueryForgeError::Execution(
                "MongoDB backend can only run document commands".to_string(),
            ));
        };

        match command {
            DocumentQuery::Find { collection, filter } => self.find(collection, filter).await,
            DocumentQuery::Aggregate {
                collection,
                pipeline,
            } => self.aggregate(collection, pipeline).await,
            DocumentQuery::Unsupported(original) => {
                warn!(query = %original, "unsupported MongoDB command from model");
                Ok(unsupported_command_result(original))
            }
        }
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connectivity)?;
        Ok(())
    }
}

/// Top-level keys of a sampled document; empty collections have no fields
pub fn fields_from_sample(sample: Option<&Document>) -> Vec<String> {
    sample
        .map(|doc| doc.keys().cloned().collect())
        .unwrap_or_default()
}

/// Replace `_id` with its text form and convert to relaxed extended JSON
pub fn normalize_document(mut doc: Document) -> Record {
    if let Some(id) = doc.get_mut("_id") {
        *id = Bson::String(id_to_text(id));
    }
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

fn id_to_text(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a JSON object (extended JSON allowed) into a BSON document
fn to_bson_document(record: &Record) -> Result<Document> {
    match Bson::try_from(Value::Object(record.clone())) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(QueryForgeError::Execution(format!(
            "expected a document, got {}",
            other
        ))),
        Err(e) => Err(QueryForgeError::Execution(format!(
            "invalid MongoDB document: {}",
            e
        ))),
    }
}

async fn collect(cursor: mongodb::Cursor<Document>) -> Result<ResultSet> {
    let docs: Vec<Document> = cursor.try_collect().await.map_err(classify)?;
    Ok(docs.into_iter().map(normalize_document).collect())
}

fn is_connectivity_failure(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
    )
}

fn connectivity(err: mongodb::error::Error) -> QueryForgeError {
    QueryForgeError::connectivity("MongoDB", err)
}

fn classify(err: mongodb::error::Error) -> QueryForgeError {
    if is_connectivity_failure(&err) {
        connectivity(err)
    } else {
        QueryForgeError::Execution(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn test_object_id_becomes_text() {
        let oid = ObjectId::new();
        let record = normalize_document(doc! { "_id": oid, "name": "ada", "age": 36 });

        assert_eq!(record["_id"], Value::String(oid.to_hex()));
        assert_eq!(record["name"], "ada");
        assert_eq!(record["age"], 36);
    }

    #[test]
    fn test_non_object_ids_become_text() {
        let record = normalize_document(doc! { "_id": 7_i32 });
        assert_eq!(record["_id"], "7");

        let record = normalize_document(doc! { "_id": "already-text" });
        assert_eq!(record["_id"], "already-text");
    }

    #[test]
    fn test_documents_without_id_are_untouched() {
        let record = normalize_document(doc! { "total": 12_i64, "user": "bob" });
        assert!(!record.contains_key("_id"));
        assert_eq!(record["total"], 12);
    }

    #[test]
    fn test_field_order_follows_document() {
        let record = normalize_document(doc! { "b": 1, "a": 2, "c": 3 });
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_fields_from_sample() {
        let sample = doc! { "_id": ObjectId::new(), "name": "x", "tags": ["a"] };
        assert_eq!(fields_from_sample(Some(&sample)), vec!["_id", "name", "tags"]);
        assert!(fields_from_sample(None).is_empty());
    }

    #[test]
    fn test_filter_conversion_accepts_extended_json() {
        let oid = ObjectId::new();
        let filter = json!({ "_id": { "$oid": oid.to_hex() }, "age": { "$gt": 30 } });
        let Value::Object(filter) = filter else { unreachable!() };

        let doc = to_bson_document(&filter).unwrap();
        assert_eq!(doc.get_object_id("_id").unwrap(), oid);
        assert_eq!(doc.get_document("age").unwrap().get_i32("$gt").unwrap(), 30);
    }
}
