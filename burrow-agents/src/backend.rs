//! Chat model backend for any OpenAI-compatible API

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// Low temperature keeps filtered text close to the source
const TEMPERATURE: f32 = 0.2;

const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Empty response")]
    EmptyResponse,
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a completion with system prompt
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

pub type SharedBackend = Arc<dyn LlmBackend>;

/// Where to send chat requests
#[derive(Debug, Clone)]
pub struct ChatModelConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
}

impl ChatModelConfig {
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: None,
            model: model.to_string(),
        }
    }

    pub fn openrouter(api_key: &str, model: &str) -> Self {
        Self {
            base_url: Some(OPENROUTER_API_BASE.to_string()),
            ..Self::openai(api_key, model)
        }
    }

    /// Local servers ignore the key but the client requires one
    pub fn local(base_url: &str, model: &str) -> Self {
        Self {
            base_url: Some(base_url.to_string()),
            ..Self::openai("sk-local", model)
        }
    }
}

pub struct ChatModelBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl ChatModelBackend {
    pub fn new(config: ChatModelConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("API key is empty".to_string()));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model,
        })
    }
}

fn api_error(e: impl ToString) -> LlmError {
    LlmError::Api(e.to_string())
}

#[async_trait]
impl LlmBackend for ChatModelBackend {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(system)
            .build()
            .map_err(api_error)?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(user)
            .build()
            .map_err(api_error)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![system.into(), user.into()])
            .temperature(TEMPERATURE)
            .max_tokens(MAX_TOKENS)
            .build()
            .map_err(api_error)?;

        let response = self.client.chat().create(request).await.map_err(api_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub fn create_backend(config: ChatModelConfig) -> Result<SharedBackend, LlmError> {
    Ok(Arc::new(ChatModelBackend::new(config)?))
}
