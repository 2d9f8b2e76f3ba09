//! Model Provider Abstraction
//!
//! Thin client layer over the external text-generation capability. The
//! service talks to OpenAI-compatible chat-completion endpoints; the trait
//! seam keeps the generation pipeline testable against scripted providers.

use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Completion options. Fixed per process: the same temperature and output
/// cap apply to every call the service makes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: Some(4096),
        }
    }
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// Output contract requested from the provider.
///
/// `Unstructured` returns free text that the local parser must recover a
/// draft from; `Structured` asks the provider to conform its reply to the
/// draft schema directly, removing local parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    Unstructured,
    Structured,
}

impl Default for InvocationMode {
    fn default() -> Self {
        InvocationMode::Unstructured
    }
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// Generate a completion from a list of messages
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Bounded exponential backoff applied to transient provider failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// First backoff delay
    pub base_delay: Duration,
    /// Backoff cap
    pub max_delay: Duration,
    /// Fixed pause appended after every retry
    pub post_retry_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(30),
            post_retry_pause: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry_index` (zero-based): exponential from
    /// the base, capped, plus the fixed post-retry pause.
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry_index);
        let backoff = self.base_delay.saturating_mul(factor).min(self.max_delay);
        backoff + self.post_retry_pause
    }
}

/// Invoke the provider, retrying transient failures per the policy. Permanent
/// provider errors propagate on the first occurrence.
pub async fn complete_with_retry(
    client: &dyn ModelProviderClient,
    messages: Vec<ChatMessage>,
    options: CompletionOptions,
    policy: &RetryPolicy,
) -> Result<CompletionResponse, ApiError> {
    let mut retries = 0u32;
    loop {
        match client.complete(messages.clone(), options.clone()).await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_transient() && retries + 1 < policy.max_attempts => {
                let delay = policy.delay_for(retries);
                tracing::warn!(
                    retry = retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient provider error, retrying"
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// OpenAI-compatible API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

fn role_to_string(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

// Helper function to map HTTP transport errors to ApiError
fn map_http_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::ProviderUnavailable(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::ProviderUnavailable(format!("Connection error: {}", error))
    } else {
        ApiError::ProviderError(format!("HTTP error: {}", error))
    }
}

fn map_status_error(status: u16, error_text: String) -> ApiError {
    match status {
        401 | 403 => ApiError::ProviderAuthFailed(format!("Authentication failed: {}", error_text)),
        429 => ApiError::ProviderRateLimit(format!("Rate limit exceeded: {}", error_text)),
        500..=599 => ApiError::ProviderUnavailable(format!(
            "Server error with status {}: {}",
            status, error_text
        )),
        _ => ApiError::ProviderRequestFailed(format!(
            "Request failed with status {}: {}",
            status, error_text
        )),
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn build_provider_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// JSON-schema response contract for the structured invocation mode.
fn email_draft_response_format() -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "email_draft",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "subject": { "type": "string" },
                    "body": { "type": "string" }
                },
                "required": ["subject", "body"],
                "additionalProperties": false
            }
        }
    })
}

/// OpenAI provider client
pub struct OpenAIClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
    mode: InvocationMode,
}

impl OpenAIClient {
    pub fn new(
        model: String,
        api_key: String,
        base_url: Option<String>,
        mode: InvocationMode,
    ) -> Result<Self, ApiError> {
        let client = build_provider_http_client()?;
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client,
            model,
            api_key,
            base_url,
            mode,
        })
    }
}

#[async_trait]
impl ModelProviderClient for OpenAIClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        // Credential check happens before any network I/O.
        if self.api_key.trim().is_empty() {
            return Err(ApiError::ConfigError(
                "Model provider API key is not set".to_string(),
            ));
        }

        let wire_messages: Vec<WireMessage> = messages
            .into_iter()
            .map(|msg| WireMessage {
                role: role_to_string(msg.role).to_string(),
                content: msg.content,
            })
            .collect();

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: wire_messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: match self.mode {
                InvocationMode::Structured => Some(email_draft_response_format()),
                InvocationMode::Unstructured => None,
            },
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_error(status, error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .first()
            .ok_or_else(|| ApiError::ProviderError("No choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content.clone(),
            model: completion.model,
            finish_reason: choice.finish_reason.clone(),
        })
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Scripted provider for pipeline tests
#[cfg(test)]
pub(crate) struct MockProvider {
    replies: std::sync::Mutex<std::collections::VecDeque<Result<String, ApiError>>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(replies: Vec<Result<String, ApiError>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into_iter().collect()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProviderClient for MockProvider {
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("{\"subject\":\"s\",\"body\":\"b\"}".to_string()));
        reply.map(|content| CompletionResponse {
            content,
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
