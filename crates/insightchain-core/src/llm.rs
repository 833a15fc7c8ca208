//! OpenAI-compatible chat-completions client (Groq, OpenAI).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::capability::{GenerationSettings, TextGeneration};
use crate::error::{ConfigurationError, GenerationError};
use crate::security::SecretValue;

pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Hosted inference providers speaking the chat-completions protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Groq,
    #[serde(alias = "open_ai")]
    OpenAi,
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::Groq => GROQ_API_BASE,
            LlmProvider::OpenAi => OPENAI_API_BASE,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Groq => "llama-3.1-8b-instant",
            LlmProvider::OpenAi => "gpt-3.5-turbo",
        }
    }

    /// Environment variable conventionally holding this provider's key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            LlmProvider::Groq => "GROQ_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Groq => f.write_str("groq"),
            LlmProvider::OpenAi => f.write_str("openai"),
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(LlmProvider::Groq),
            "openai" | "open_ai" => Ok(LlmProvider::OpenAi),
            other => Err(ConfigurationError::Invalid(format!(
                "unknown llm provider `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Text-generation capability backed by `POST {base_url}/chat/completions`.
pub struct ChatCompletionsClient {
    client: Client,
    base_url: String,
    api_key: SecretValue,
    settings: GenerationSettings,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretValue,
        settings: GenerationSettings,
        request_timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ConfigurationError::HttpClient)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            settings,
        })
    }

    pub fn for_provider(
        provider: LlmProvider,
        api_key: SecretValue,
        settings: GenerationSettings,
        request_timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        Self::new(
            provider.default_base_url(),
            api_key,
            settings,
            request_timeout,
        )
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextGeneration for ChatCompletionsClient {
    #[instrument(
        name = "llm.generate",
        skip(self, system, user),
        fields(model = %self.settings.model, prompt_len = user.len())
    )]
    async fn generate(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GenerationError::Authentication {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| {
                GenerationError::MalformedResponse("response carried no message content".into())
            })?;

        debug!(response_len = content.len(), "chat completion received");
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}
