//! LLM integration module
//!
//! Provider abstraction, the OpenAI implementation, and the translator that
//! turns questions into structured queries.

pub mod client;
pub mod provider;
pub mod translator;

// Provider implementations
pub mod providers {
    pub mod openai;
}

// Re-exports
pub use provider::{GenerationParams, LLMProvider, LLMResponse, Message, MessageRole};
pub use translator::QueryTranslator;
