use std::time::Duration;

use anyhow::{Context, Result};
use bookline_core::{BookingField, BookingInfo, ExtractError};
use bookline_retrieval::RetrievedChunk;
use serde::Deserialize;
use serde_json::{json, Value};

const EXTRACTION_SYSTEM_PROMPT: &str = "You are a helpful assistant that extracts structured \
booking info from user input. Always respond with exactly this JSON object and nothing else:\n\
{\n  \"name\": \"<user name>\",\n  \"email\": \"<user email>\",\n  \"service\": \"<service>\",\n\
  \"date\": \"YYYY-MM-DD\",\n  \"time\": \"HH:MM\"\n}";

const ANSWER_SYSTEM_PROMPT: &str = "You are a booking assistant for a wellness practice. Answer \
the user's question using only the provided context. If the context does not contain the answer, \
say you don't know. Keep answers short and concrete.";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl LlmConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai/v1";
    pub const DEFAULT_MODEL: &'static str = "llama-3.1-8b-instant";
}

#[derive(Clone)]
struct ChatClient {
    http: reqwest::Client,
    config: LlmConfig,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatClient {
    fn new(config: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build LLM HTTP client")?;

        Ok(Self { http, config })
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .http
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?
            .error_for_status()
            .context("chat completion returned an error status")?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .context("chat completion response was not valid JSON")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("chat completion had no choices")
    }
}

/// Slot extractor backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct LlmSlotExtractor {
    client: ChatClient,
}

impl LlmSlotExtractor {
    pub fn new(config: LlmConfig) -> Result<Self> {
        Ok(Self {
            client: ChatClient::new(config)?,
        })
    }

    pub async fn extract(&self, input: &str) -> Result<BookingInfo, ExtractError> {
        let content = self
            .client
            .complete(EXTRACTION_SYSTEM_PROMPT, input, 0.0, 300)
            .await
            .map_err(|error| ExtractError::Transport(error.to_string()))?;

        parse_booking_payload(&content)
    }
}

/// Maps the raw model output onto [`BookingInfo`]. Unparseable output is a
/// transport failure; parseable output with missing or empty keys is a
/// schema failure naming the offending fields.
fn parse_booking_payload(content: &str) -> Result<BookingInfo, ExtractError> {
    let stripped = strip_code_fences(content);
    let value: Value = serde_json::from_str(stripped)
        .map_err(|error| ExtractError::Transport(format!("unparseable extractor output: {error}")))?;

    let mut info = BookingInfo::default();
    let mut invalid = Vec::new();

    for field in BookingField::ALL {
        match value.get(field.as_str()).and_then(Value::as_str) {
            Some(text) if !text.trim().is_empty() => info.set(field, text.trim()),
            _ => invalid.push(field),
        }
    }

    if invalid.is_empty() {
        Ok(info)
    } else {
        Err(ExtractError::SchemaInvalid(invalid))
    }
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Answer generator backed by the same chat-completions endpoint, prompted
/// to stay inside the retrieved context.
#[derive(Clone)]
pub struct LlmAnswerGenerator {
    client: ChatClient,
}

impl LlmAnswerGenerator {
    pub fn new(config: LlmConfig) -> Result<Self> {
        Ok(Self {
            client: ChatClient::new(config)?,
        })
    }

    pub async fn answer(&self, query: &str, context: &[RetrievedChunk]) -> Result<String> {
        let context_block = context
            .iter()
            .map(|chunk| format!("[{}] {}", chunk.title, chunk.snippet))
            .collect::<Vec<_>>()
            .join("\n");

        let user = format!("Context:\n{}\n\nConversation:\n{}", context_block, query);
        self.client
            .complete(ANSWER_SYSTEM_PROMPT, &user, 0.4, 500)
            .await
    }
}
