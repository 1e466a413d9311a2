//! OpenAI API Provider
//!
//! This module implements the LLMProvider trait for OpenAI's chat completions
//! API (or any endpoint speaking the same protocol).

use crate::error::{QueryForgeError, Result};
use crate::llm::client::LLMHttpClient;
use crate::llm::provider::{GenerationParams, LLMProvider, LLMResponse, Message, MessageRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI chat completions endpoint
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/chat/completions";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI GPT API provider
pub struct OpenAIProvider {
    api_key: String,
    model: String,
    endpoint: String,
    client: LLMHttpClient,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model identifier (defaults to gpt-4o)
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: OPENAI_API_BASE.to_string(),
            client: LLMHttpClient::new()?,
        })
    }

    /// Send requests to a different chat-completions endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replace the HTTP client (timeout / retry policy)
    pub fn with_client(mut self, client: LLMHttpClient) -> Self {
        self.client = client;
        self
    }

    /// Endpoint requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Convert our Message format to OpenAI format
    fn convert_messages_to_openai(&self, messages: &[Message]) -> Vec<OpenAIMessage> {
        messages
            .iter()
            .map(|msg| OpenAIMessage {
                role: match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                    MessageRole::System => "system",
                }
                .to_string(),
                content: msg.content.clone(),
            })
            .collect()
    }

    fn build_request(&self, messages: &[Message], params: Option<&GenerationParams>) -> OpenAIRequest {
        let defaults = GenerationParams::default();
        let params = params.unwrap_or(&defaults);

        OpenAIRequest {
            model: self.model.clone(),
            messages: self.convert_messages_to_openai(messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            stop: params.stop_sequences.clone(),
        }
    }

    fn parse_response(&self, body: &str) -> Result<LLMResponse> {
        let response: OpenAIResponse =
            serde_json::from_str(body).map_err(|e| QueryForgeError::LLMApiError {
                provider: "OpenAI".to_string(),
                message: format!("Failed to parse response: {}", e),
                status: 0,
            })?;

        let first = response.choices.into_iter().next();
        let usage = response.usage;

        Ok(LLMResponse {
            content: first
                .as_ref()
                .and_then(|c| c.message.content.clone())
                .unwrap_or_default(),
            model: response.model,
            input_tokens: usage.as_ref().map(|u| u.prompt_tokens),
            output_tokens: usage.as_ref().map(|u| u.completion_tokens),
            total_tokens: usage.as_ref().map(|u| u.total_tokens),
            finish_reason: first.and_then(|c| c.finish_reason),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn generate(
        &self,
        messages: &[Message],
        params: Option<&GenerationParams>,
    ) -> Result<LLMResponse> {
        self.validate_config()?;

        let request = self.build_request(messages, params);
        let headers = LLMHttpClient::build_headers(&self.api_key)?;
        let body = self
            .client
            .post_json("OpenAI", &self.endpoint, headers, &request)
            .await?;

        let response = self.parse_response(&body)?;
        debug!(
            model = response.model.as_deref().unwrap_or(&self.model),
            tokens = response.get_total_tokens(),
            "completion received"
        );
        Ok(response)
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// OpenAI API request format
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

/// OpenAI API message format
#[derive(Debug, Serialize, Clone)]
struct OpenAIMessage {
    role: String,
    content: String,
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

/// Choice in OpenAI response
#[derive(Debug, Deserialize, Clone)]
struct Choice {
    message: OpenAIMessageResponse,
    finish_reason: Option<String>,
}

/// Message in OpenAI response
#[derive(Debug, Deserialize, Clone)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize, Clone)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test-key", None).unwrap();
        assert_eq!(provider.model(), "gpt-4o");
        assert_eq!(provider.endpoint(), OPENAI_API_BASE);
        assert_eq!(provider.provider_name(), "OpenAI");
    }

    #[test]
    fn test_openai_provider_with_custom_model_and_endpoint() {
        let provider = OpenAIProvider::new("test-key", Some("gpt-4o-mini".to_string()))
            .unwrap()
            .with_endpoint("http://localhost:8080/v1/chat/completions");
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_request_carries_temperature() {
        let provider = OpenAIProvider::new("test-key", None).unwrap();
        let params = GenerationParams::new().with_temperature(0.1);
        let request = provider.build_request(&[Message::user("hi")], Some(&params));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert!((json["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("stop").is_none());
    }

    #[test]
    fn test_message_conversion() {
        let provider = OpenAIProvider::new("test-key", None).unwrap();

        let messages = vec![
            Message::system("You are a database assistant."),
            Message::user("Hello"),
            Message::assistant("Hi there!"),
        ];

        let openai_messages = provider.convert_messages_to_openai(&messages);
        assert_eq!(openai_messages.len(), 3);
        assert_eq!(openai_messages[0].role, "system");
        assert_eq!(openai_messages[0].content, "You are a database assistant.");
        assert_eq!(openai_messages[1].role, "user");
        assert_eq!(openai_messages[2].role, "assistant");
    }

    #[test]
    fn test_parse_response() {
        let provider = OpenAIProvider::new("test-key", None).unwrap();
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-4o-2024-08-06",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "SELECT 1"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;

        let response = provider.parse_response(body).unwrap();
        assert_eq!(response.content, "SELECT 1");
        assert_eq!(response.total_tokens, Some(12));
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));

        assert!(provider.parse_response("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let provider = OpenAIProvider::new("", None).unwrap();
        assert!(!provider.has_api_key());

        let err = provider.generate(&[Message::user("hi")], None).await.unwrap_err();
        assert!(matches!(err, QueryForgeError::LLMApiKeyMissing(_)));
    }
}
