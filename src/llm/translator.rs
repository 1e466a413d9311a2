//! Query Translator
//!
//! Turns a natural-language question plus a schema map into a structured
//! query by asking the model and post-processing its reply.

use crate::database::connection::DatabaseBackend;
use crate::database::query::StructuredQuery;
use crate::database::schema::SchemaMap;
use crate::error::{QueryForgeError, Result};
use crate::llm::provider::{GenerationParams, LLMProvider, Message};
use std::sync::Arc;
use tracing::debug;

/// Sampling temperature used for translation
pub const TRANSLATION_TEMPERATURE: f32 = 0.1;

const SYSTEM_PROMPT: &str = "You are a database assistant.";

pub struct QueryTranslator {
    provider: Arc<dyn LLMProvider>,
    params: GenerationParams,
}

impl QueryTranslator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            params: GenerationParams::new().with_temperature(TRANSLATION_TEMPERATURE),
        }
    }

    /// Override the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.params = self.params.with_temperature(temperature);
        self
    }

    /// Build the user prompt for a question
    pub fn build_prompt(&self, question: &str, backend: DatabaseBackend, schema: &SchemaMap) -> String {
        format!(
            "You are an expert database assistant.\n\
            Here is information about the database schema:\n\
            {schema}\n\n\
            User question: {question}\n\
            Convert it into a {kind} query. {hint}\n\n\
            Return ONLY the query, nothing else.",
            schema = schema.format_for_llm(),
            question = question,
            kind = backend.name().to_uppercase(),
            hint = backend.translation_hint(),
        )
    }

    /// Translate a question into an executable query for `backend`
    pub async fn translate(
        &self,
        question: &str,
        backend: DatabaseBackend,
        schema: &SchemaMap,
    ) -> Result<StructuredQuery> {
        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(self.build_prompt(question, backend, schema)),
        ];

        let response = self
            .provider
            .generate(&messages, Some(&self.params))
            .await
            .map_err(|e| QueryForgeError::translation(format!("model call failed: {}", e), None))?;

        let reply = strip_code_fence(&response.content);
        debug!(backend = backend.name(), reply, "model reply");

        if reply.is_empty() {
            return Err(QueryForgeError::translation(
                "model returned an empty reply",
                Some(&response.content),
            ));
        }
        backend.parse_reply(reply)
    }
}

/// Return the content of the first fenced code block, or the trimmed reply
///
/// A language tag on the opening fence (```json, ```sql) is dropped.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let rest = &trimmed[start + 3..];
    let block = match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    };

    let body = match block.split_once('\n') {
        Some((tag, tail)) if is_language_tag(tag) => tail,
        _ => block,
    };
    body.trim()
}

/// Fence info strings a model puts before a query; anything else is query text
const LANGUAGE_TAGS: &[&str] = &[
    "sql", "mysql", "mariadb", "json", "json5", "javascript", "js", "mongodb", "mongo", "python",
    "py", "text", "plaintext",
];

fn is_language_tag(line: &str) -> bool {
    let tag = line.trim();
    LANGUAGE_TAGS.iter().any(|known| known.eq_ignore_ascii_case(tag))
}
