//! Web shell: one static page plus a JSON API over the concept map.
//!
//! The server keeps no per-user state. The browser holds its [`Session`]
//! and sends it with every request; handlers return the next session.
//!
//! [`Session`]: mappa_core::Session

pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use mappa_ask::CompletionClient;
use mappa_core::{ConceptMap, Settings};
use mappa_relay::TelegramRelay;

/// Everything a request needs. Built once at startup and never mutated.
pub struct AppState {
    pub map: ConceptMap,
    pub relay: Option<TelegramRelay>,
    pub asker: Option<CompletionClient>,
    /// Why the ask feature is off, when credentials exist but the client could not be built.
    pub ask_setup_error: Option<String>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(map: ConceptMap) -> Self {
        Self {
            map,
            relay: None,
            asker: None,
            ask_setup_error: None,
        }
    }

    pub fn with_relay(mut self, relay: TelegramRelay) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn with_asker(mut self, asker: CompletionClient) -> Self {
        self.asker = Some(asker);
        self
    }

    /// Wire up whichever integrations `settings` has credentials for.
    pub fn from_settings(map: ConceptMap, settings: &Settings) -> Self {
        let mut state = Self::new(map);

        state.relay = TelegramRelay::from_settings(&settings.relay);
        if state.relay.is_none() {
            tracing::warn!("Telegram relay disabled: TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set");
        }

        if settings.ai_configured() {
            match CompletionClient::from_settings(&settings.ai) {
                Ok(client) => {
                    tracing::info!(backend = client.label(), "AI questions enabled");
                    state.asker = Some(client);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "AI questions disabled");
                    state.ask_setup_error = Some(e.to_string());
                }
            }
        } else {
            tracing::warn!("AI questions disabled: OPENAI_API_KEY not set");
        }

        state
    }
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/api/status", get(routes::api_status))
        .route("/api/view", post(routes::api_view))
        .route("/api/navigate", post(routes::api_navigate))
        .route("/api/search", post(routes::api_search))
        .route("/api/send", post(routes::api_send))
        .route("/api/ask", post(routes::api_ask))
        .with_state(state)
}
