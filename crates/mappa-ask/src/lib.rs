pub mod engine;
mod parse;
pub mod prompt;

use std::sync::Arc;

pub use engine::{CompletionBackend, LlmBackend};
pub use parse::{answer_schema, parse_answer, MessageResponse};

#[derive(Debug, Clone, thiserror::Error)]
pub enum AskError {
    #[error("write a question before sending")]
    EmptyQuestion,
    #[error("AI is not set up: {0}")]
    Setup(String),
    #[error("error calling the AI: {0}")]
    Service(String),
    #[error("the AI returned an empty answer")]
    EmptyAnswer,
}

/// Answers free-form questions through a completion backend.
///
/// The backend handle is created once and shared; cloning the client is cheap.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Build a client backed by the provider named in `settings`.
    pub fn from_settings(settings: &mappa_core::AiSettings) -> Result<Self, AskError> {
        Ok(Self::new(Arc::new(LlmBackend::from_settings(settings)?)))
    }

    pub fn label(&self) -> &str {
        self.backend.label()
    }

    /// Ask `question` and return the answer split into chat-sized segments.
    pub async fn ask(&self, question: &str) -> Result<Vec<String>, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::EmptyQuestion);
        }

        let prompt = prompt::render(question);
        tracing::info!(backend = self.backend.label(), chars = question.chars().count(), "asking AI");

        let raw = self.backend.complete(&prompt).await.inspect_err(|e| {
            tracing::warn!(backend = self.backend.label(), error = %e, "completion failed");
        })?;
        tracing::debug!(raw = %raw, "raw AI output");

        let answer = parse_answer(&raw)?;
        tracing::info!(segments = answer.len(), "AI answered");
        Ok(answer)
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("backend", &self.backend.label())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Echo {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionBackend for Echo {
        fn label(&self) -> &str {
            "echo"
        }

        async fn complete(&self, prompt: &str) -> Result<String, AskError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(r#"{"messages": ["ok"]}"#.to_string())
        }
    }

    #[tokio::test]
    async fn question_is_sent_inside_the_template() {
        let backend = Arc::new(Echo {
            seen: Mutex::new(Vec::new()),
        });
        let client = CompletionClient::new(backend.clone());
        client.ask("  What is a net?  ").await.unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], prompt::render("What is a net?"));
    }

    #[tokio::test]
    async fn blank_question_never_reaches_the_backend() {
        let backend = Arc::new(Echo {
            seen: Mutex::new(Vec::new()),
        });
        let client = CompletionClient::new(backend.clone());
        assert!(matches!(client.ask(" \n ").await, Err(AskError::EmptyQuestion)));
        assert!(backend.seen.lock().unwrap().is_empty());
    }
}
