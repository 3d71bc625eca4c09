//! HTTP handlers for the page and the JSON API.
//!
//! Integration failures are reported in the response body (`ok: false`)
//! rather than as server errors, so the page can show them inline.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

use mappa_core::settings::{AI_SETUP_HINT, RELAY_SETUP_HINT};
use mappa_core::{
    resolve, search_leaves, stats, LeafEntry, MapStats, NodeView, Session, SEARCH_RESULT_LIMIT,
};
use mappa_relay::answer_messages;

use super::SharedState;

pub async fn index() -> impl IntoResponse {
    Html(include_str!("../static/index.html"))
}

pub async fn health() -> impl IntoResponse {
    "OK"
}

// === Status ===

#[derive(Serialize)]
pub struct StatusResponse {
    pub title: Option<String>,
    pub stats: MapStats,
    pub relay_enabled: bool,
    pub ask_enabled: bool,
    pub relay_hint: Option<&'static str>,
    pub ask_hint: Option<String>,
}

/// GET /api/status
pub async fn api_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let root = state.map.root();
    let ask_hint = match (&state.asker, &state.ask_setup_error) {
        (Some(_), _) => None,
        (None, Some(e)) => Some(e.clone()),
        (None, None) => Some(AI_SETUP_HINT.to_string()),
    };

    Json(StatusResponse {
        title: root.title.clone(),
        stats: stats::<String>(root, &[]),
        relay_enabled: state.relay.is_some(),
        ask_enabled: state.asker.is_some(),
        relay_hint: state.relay.is_none().then_some(RELAY_SETUP_HINT),
        ask_hint,
    })
}

// === Navigation ===

#[derive(Serialize)]
pub struct ViewResponse {
    pub session: Session,
    pub view: NodeView,
    pub recovered: bool,
    pub stats: MapStats,
}

fn render(state: &SharedState, session: Session) -> ViewResponse {
    let root = state.map.root();
    let viewed = session.view(root);
    ViewResponse {
        stats: stats(root, &viewed.session.current_path),
        session: viewed.session,
        view: viewed.view,
        recovered: viewed.recovered,
    }
}

#[derive(Deserialize)]
pub struct ViewRequest {
    #[serde(default)]
    pub session: Session,
}

/// POST /api/view
pub async fn api_view(
    State(state): State<SharedState>,
    Json(req): Json<ViewRequest>,
) -> Json<ViewResponse> {
    Json(render(&state, req.session))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NavAction {
    Enter { key: String },
    Back,
    Home,
    Jump { path: Vec<String> },
    OpenSearch,
    CloseSearch,
    OpenAsk,
    CloseAsk,
}

impl NavAction {
    fn apply(self, session: Session) -> Session {
        match self {
            NavAction::Enter { key } => session.enter(key),
            NavAction::Back => session.back(),
            NavAction::Home => session.home(),
            NavAction::Jump { path } => session.jump_to(path),
            NavAction::OpenSearch => session.open_search(),
            NavAction::CloseSearch => session.close_search(),
            NavAction::OpenAsk => session.open_ask(),
            NavAction::CloseAsk => session.close_ask(),
        }
    }
}

#[derive(Deserialize)]
pub struct NavigateRequest {
    #[serde(default)]
    pub session: Session,
    pub action: NavAction,
}

/// POST /api/navigate
pub async fn api_navigate(
    State(state): State<SharedState>,
    Json(req): Json<NavigateRequest>,
) -> Json<ViewResponse> {
    tracing::debug!(action = ?req.action, path = ?req.session.current_path, "navigate");
    let session = req.action.apply(req.session);
    Json(render(&state, session))
}

// === Search ===

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<LeafEntry>,
    pub total: usize,
    pub shown: usize,
}

/// POST /api/search
pub async fn api_search(
    State(state): State<SharedState>,
    Json(req): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let limit = req.limit.unwrap_or(SEARCH_RESULT_LIMIT);
    let found = search_leaves(state.map.root(), &req.query, limit);
    Json(SearchResponse {
        shown: found.matches.len(),
        total: found.total,
        results: found.matches,
    })
}

// === Relay ===

#[derive(Deserialize)]
pub struct SendRequest {
    pub session: Session,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub ok: bool,
    pub message: String,
    pub session: Session,
}

/// POST /api/send - relay the message of the leaf the session is on
pub async fn api_send(
    State(state): State<SharedState>,
    Json(req): Json<SendRequest>,
) -> Json<SendResponse> {
    let session = req.session;

    let Some(relay) = &state.relay else {
        return Json(SendResponse {
            ok: false,
            message: RELAY_SETUP_HINT.to_string(),
            session,
        });
    };

    let Some(message) = resolve(state.map.root(), &session.current_path)
        .and_then(|n| n.message())
        .filter(|m| !m.trim().is_empty())
    else {
        return Json(SendResponse {
            ok: false,
            message: "This node has no message to send.".to_string(),
            session,
        });
    };

    match relay.send_one(message).await {
        Ok(()) => {
            tracing::info!(path = ?session.current_path, "leaf message relayed");
            Json(SendResponse {
                ok: true,
                message: "Message sent!".to_string(),
                session: session.mark_sent(),
            })
        }
        Err(e) => {
            tracing::warn!(path = ?session.current_path, error = %e, "leaf relay failed");
            Json(SendResponse {
                ok: false,
                message: format!("Sending failed: {e}"),
                session,
            })
        }
    }
}

// === Ask ===

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Forward the question and answer to Telegram when the relay is set up.
    #[serde(default = "default_true")]
    pub relay: bool,
}

#[derive(Serialize)]
pub struct RelayOutcome {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub ok: bool,
    pub answers: Vec<String>,
    pub error: Option<String>,
    pub relay: Option<RelayOutcome>,
}

impl AskResponse {
    fn failed(error: String) -> Self {
        Self {
            ok: false,
            answers: Vec::new(),
            error: Some(error),
            relay: None,
        }
    }
}

/// POST /api/ask
pub async fn api_ask(
    State(state): State<SharedState>,
    Json(req): Json<AskRequest>,
) -> Json<AskResponse> {
    let Some(asker) = &state.asker else {
        let hint = state
            .ask_setup_error
            .clone()
            .unwrap_or_else(|| AI_SETUP_HINT.to_string());
        return Json(AskResponse::failed(hint));
    };

    let answers = match asker.ask(&req.question).await {
        Ok(answers) => answers,
        Err(e) => return Json(AskResponse::failed(e.to_string())),
    };

    let relay = match (&state.relay, req.relay) {
        (Some(relay), true) => {
            let messages = answer_messages(req.question.trim(), &answers);
            Some(match relay.send_many(&messages).await {
                Ok(n) => RelayOutcome {
                    ok: true,
                    message: format!("All {n} messages sent!"),
                },
                Err(e) => RelayOutcome {
                    ok: false,
                    message: format!("Sending failed: {e}"),
                },
            })
        }
        _ => None,
    };

    Json(AskResponse {
        ok: true,
        answers,
        error: None,
        relay,
    })
}
