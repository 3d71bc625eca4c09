//! Relay of text messages to a Telegram chat through the Bot API.
//!
//! Sends are best effort: one attempt per message, no retries, and a fixed
//! pause between consecutive messages to stay under the bot rate limit.

mod escape;

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use mappa_core::RelaySettings;

pub use escape::escape_html;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Pause between two consecutive messages of one batch.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(500);

const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Telegram answered {status}: {reason}")]
    Rejected { status: StatusCode, reason: String },
    #[error("{} of {attempted} messages failed: {}", failures.len(), join_failures(failures))]
    Partial {
        attempted: usize,
        failures: Vec<SendFailure>,
    },
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL embeds the bot token.
        Self::Transport(err.without_url())
    }
}

/// One failed message of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    /// 1-based position in the batch.
    pub index: usize,
    pub reason: String,
}

fn join_failures(failures: &[SendFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("Msg {}: {}", f.index, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct ApiReply {
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramRelay {
    client: Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
    delay: Duration,
}

impl fmt::Debug for TelegramRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramRelay")
            .field("base_url", &self.base_url)
            .field("bot_token", &"***")
            .field("chat_id", &self.chat_id)
            .field("delay", &self.delay)
            .finish()
    }
}

impl TelegramRelay {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            delay: DEFAULT_SEND_DELAY,
        }
    }

    /// Build a relay from settings, or `None` when token or chat id is missing.
    pub fn from_settings(settings: &RelaySettings) -> Option<Self> {
        if settings.bot_token.is_empty() || settings.chat_id.is_empty() {
            return None;
        }
        Some(Self::new(&settings.bot_token, &settings.chat_id))
    }

    /// Point the relay at another Bot API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.bot_token)
    }

    /// Send one message. The text is HTML-escaped because it goes out with
    /// `parse_mode: HTML`.
    pub async fn send_one(&self, text: &str) -> Result<(), RelayError> {
        let escaped = escape_html(text);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: &escaped,
            parse_mode: "HTML",
        };

        let response = self.client.post(self.send_url()).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(chat_id = %self.chat_id, chars = text.chars().count(), "message relayed");
            return Ok(());
        }

        let raw = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ApiReply>(&raw)
            .ok()
            .and_then(|reply| reply.description)
            .unwrap_or_else(|| truncate(&raw, MAX_ERROR_BODY));
        Err(RelayError::Rejected { status, reason })
    }

    /// Send every text in order, pausing between sends. A failure does not
    /// stop the batch; all failures are reported together at the end.
    pub async fn send_many<S: AsRef<str>>(&self, texts: &[S]) -> Result<usize, RelayError> {
        let mut failures = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }
            if let Err(e) = self.send_one(text.as_ref()).await {
                tracing::warn!(index = i + 1, error = %e, "relay message failed");
                failures.push(SendFailure {
                    index: i + 1,
                    reason: e.to_string(),
                });
            }
        }

        if failures.is_empty() {
            tracing::info!(count = texts.len(), "relayed batch");
            Ok(texts.len())
        } else {
            Err(RelayError::Partial {
                attempted: texts.len(),
                failures,
            })
        }
    }
}

/// Messages relayed after the AI answered a question: the question first,
/// then the answer, numbered when it came in several parts.
pub fn answer_messages<S: AsRef<str>>(question: &str, answers: &[S]) -> Vec<String> {
    let mut messages = vec![format!("❓ Question: {question}")];
    match answers {
        [single] => messages.push(format!("🤖 AI answer:\n{}", single.as_ref())),
        parts => {
            let n = parts.len();
            messages.extend(
                parts
                    .iter()
                    .enumerate()
                    .map(|(i, part)| format!("🤖 AI answer (part {}/{n}):\n{}", i + 1, part.as_ref())),
            );
        }
    }
    messages
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
