//! Chat-completion client
//!
//! OpenAI chat completions with a system and a user message.
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use async_trait::async_trait;
use docent_core::{CompletionRequest, DocentError, LlmClient, OpenAiConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// OpenAI Client
// ============================================================================

/// OpenAI API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Choice {
    message: Message,
    finish_reason: Option<String>,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| DocentError::ConfigError("OpenAI API key required".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocentError::ConfigError(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.chat_model.clone(),
        })
    }

    /// Set custom base URL (for compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.model.clone(),
            messages: vec![
                Message::new("system", &request.system_prompt),
                Message::new("user", &request.user_prompt),
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| DocentError::LlmError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DocentError::LlmError(format!(
                "OpenAI error ({status}): {error_text}"
            )));
        }

        let result: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| DocentError::LlmError(format!("Failed to parse response: {e}")))?;

        let answer = first_choice(result)?;
        debug!(model = %self.model, chars = answer.len(), "completion received");
        Ok(answer)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn first_choice(response: OpenAiResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| DocentError::LlmError("No response generated".to_string()))
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an LLM client from config
pub fn create_llm_client(config: &OpenAiConfig) -> Result<Box<dyn LlmClient>> {
    Ok(Box::new(OpenAiClient::from_config(config)?))
}

// ============================================================================
// Tests
// ============================================================================
