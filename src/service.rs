//! Query Service
//!
//! Orchestrates one request:
//! cache lookup, then (on a miss) introspect -> translate -> execute -> store.
//! Cached answers are returned as-is and never revalidated.

use crate::database::cache::{cache_key, ResultCache};
use crate::database::connection::{DatabaseBackend, QueryBackend};
use crate::database::query::ResultSet;
use crate::error::{QueryForgeError, Result};
use crate::llm::translator::QueryTranslator;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer to a question, as serialized JSON
#[derive(Debug)]
pub struct Answer {
    pub backend: DatabaseBackend,
    /// The result set exactly as stored in the cache
    pub results: Box<RawValue>,
    /// Whether the answer came from the cache
    pub cached: bool,
}

pub struct QueryService {
    backends: HashMap<DatabaseBackend, Arc<dyn QueryBackend>>,
    translator: QueryTranslator,
    cache: ResultCache,
}

impl QueryService {
    pub fn new(translator: QueryTranslator, cache: ResultCache) -> Self {
        Self {
            backends: HashMap::new(),
            translator,
            cache,
        }
    }

    /// Register a live backend (replaces any previous one of the same kind)
    pub fn with_backend(mut self, backend: Arc<dyn QueryBackend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    /// Kinds with a registered backend
    pub fn configured_backends(&self) -> Vec<DatabaseBackend> {
        DatabaseBackend::ALL
            .into_iter()
            .filter(|kind| self.backends.contains_key(kind))
            .collect()
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Answer `question` against the backend named by `db_type`
    ///
    /// Unknown `db_type` values fail before the cache, schema or model are touched.
    pub async fn answer(&self, question: &str, db_type: &str) -> Result<Answer> {
        let backend: DatabaseBackend = db_type.parse()?;
        let key = cache_key(backend, question);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => {
                info!(backend = backend.name(), "cache hit");
                return Ok(Answer {
                    backend,
                    results: RawValue::from_string(cached)?,
                    cached: true,
                });
            }
            Ok(None) => debug!(backend = backend.name(), "cache miss"),
            Err(e) => warn!(error = %e, "cache lookup failed, treating as miss"),
        }

        let results = self.run(question, backend).await?;
        let serialized = serde_json::to_string(&results)?;

        if let Err(e) = self.cache.put(&key, serialized.clone()).await {
            warn!(error = %e, "failed to store result in cache");
        }

        Ok(Answer {
            backend,
            results: RawValue::from_string(serialized)?,
            cached: false,
        })
    }

    /// Run the uncached pipeline: introspect, translate, execute
    pub async fn run(&self, question: &str, backend: DatabaseBackend) -> Result<ResultSet> {
        let db = self.backend(backend)?;

        let schema = db.introspect().await?;
        info!(backend = backend.name(), entities = ?schema.entity_names(), "schema introspected");

        let query = self.translator.translate(question, backend, &schema).await?;
        debug!(backend = backend.name(), query = %query.summary(), "generated query");

        let results = db.execute(&query).await?;
        info!(backend = backend.name(), rows = results.len(), "query executed");
        Ok(results)
    }

    /// Ping every registered backend
    pub async fn health(&self) -> Vec<(DatabaseBackend, bool)> {
        let mut status = Vec::new();
        for kind in self.configured_backends() {
            let up = match self.backends.get(&kind) {
                Some(db) => db.ping().await.is_ok(),
                None => false,
            };
            status.push((kind, up));
        }
        status
    }

    fn backend(&self, kind: DatabaseBackend) -> Result<&Arc<dyn QueryBackend>> {
        self.backends
            .get(&kind)
            .ok_or_else(|| QueryForgeError::connectivity(kind.display_name(), "backend is not configured"))
    }
}
