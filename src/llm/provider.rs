use crate::config::LLMConfig;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse};
use async_trait::async_trait;

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;

    async fn create_embedding(&self, model: &str, input: &str) -> AppResult<Vec<f32>>;
}

/// Provider-agnostic front for chat completions and embeddings.
/// The adapter is chosen once at startup from `LLM_PROVIDER`.
pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    model: String,
    embedding_model: String,
}

impl LLM {
    pub fn from_config(config: &LLMConfig) -> AppResult<Self> {
        let adapter: Box<dyn LLMAdapter> = match config.provider.as_str() {
            "openai" => Box::new(crate::llm::openai::OpenAIAdapter::new(
                &config.api_key,
                config.base_url.as_deref(),
            )),
            "ollama" => Box::new(crate::llm::ollama::OllamaAdapter::new(
                config.base_url.as_deref(),
            )),
            other => {
                return Err(AppError::Internal(format!(
                    "Unsupported LLM provider: {other}"
                )))
            }
        };

        Ok(Self {
            adapter,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    /// Chat completion with the configured default model.
    pub async fn complete(
        &self,
        messages: Vec<crate::types::LLMMessage>,
        system_instruction: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> AppResult<LLMResponse> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
            temperature,
            system_instruction,
        };
        self.adapter.create_chat_completion(&request).await
    }

    pub async fn create_embedding(&self, input: &str) -> AppResult<Vec<f32>> {
        self.adapter
            .create_embedding(&self.embedding_model, input)
            .await
    }
}
