use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, StructuredOutputFormat};
use llm::LLMProvider;

use mappa_core::AiSettings;

use crate::parse::answer_schema;
use crate::AskError;

const TEMPERATURE: f32 = 0.7;

/// Anything that can turn a prompt into raw model output.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short label for logs, e.g. `openai/gpt-4.1-mini`.
    fn label(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, AskError>;
}

fn map_backend(provider: &str) -> Result<LLMBackend, AskError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(AskError::Setup(format!("unknown provider: {other}"))),
    }
}

/// Provider handle from the `llm` crate, built once and reused for every question.
pub struct LlmBackend {
    provider: Box<dyn LLMProvider>,
    label: String,
}

impl LlmBackend {
    pub fn from_settings(settings: &AiSettings) -> Result<Self, AskError> {
        let backend = map_backend(&settings.provider)?;

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .model(&settings.model)
            .temperature(TEMPERATURE)
            .schema(StructuredOutputFormat {
                name: "MessageResponse".to_string(),
                description: Some("Answer split into short chat messages".to_string()),
                schema: Some(answer_schema()),
                strict: Some(true),
            });

        if !settings.api_key.is_empty() {
            builder = builder.api_key(&settings.api_key);
        }

        let provider = builder
            .build()
            .map_err(|e| AskError::Setup(format!("build LLM: {e}")))?;

        Ok(Self {
            provider,
            label: format!("{}/{}", settings.provider, settings.model),
        })
    }
}

#[async_trait]
impl CompletionBackend for LlmBackend {
    fn label(&self) -> &str {
        &self.label
    }

    async fn complete(&self, prompt: &str) -> Result<String, AskError> {
        let messages = vec![ChatMessage::user().content(prompt).build()];

        let response = self
            .provider
            .chat(&messages)
            .await
            .map_err(|e| AskError::Service(e.to_string()))?;

        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AskError::EmptyAnswer),
        }
    }
}
