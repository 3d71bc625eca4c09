use std::path::PathBuf;
use std::sync::Arc;

use mappa_ask::CompletionClient;
use mappa_core::settings::{AI_SETUP_HINT, RELAY_SETUP_HINT};
use mappa_core::{
    breadcrumb, collect_leaves, load_concept_map, read_settings, resolve, search_leaves, stats,
    ConceptMap, LeafEntry, Session, DEFAULT_MAP_FILE, SEARCH_RESULT_LIMIT,
};
use mappa_relay::{answer_messages, TelegramRelay};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GetNodeRequest {
    /// Keys from the root to the node, e.g. ["spaces", "compact"]. Empty for the root.
    #[serde(default)]
    path: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SearchLeavesRequest {
    /// Case-insensitive text to look for in leaf titles
    query: String,
    /// Maximum number of hits to return (default 10)
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SendLeafRequest {
    /// Keys from the root to a leaf node
    path: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AskRequest {
    /// Question for the AI
    question: String,
    /// Also forward the question and the answer to Telegram (default true)
    relay: Option<bool>,
}

// --- Server ---

#[derive(Clone)]
pub struct MappaServer {
    map: Arc<ConceptMap>,
    relay: Option<TelegramRelay>,
    asker: Option<CompletionClient>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MappaServer {
    pub fn new(
        map: ConceptMap,
        relay: Option<TelegramRelay>,
        asker: Option<CompletionClient>,
    ) -> Self {
        Self {
            map: Arc::new(map),
            relay,
            asker,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Get one node of the concept map. Returns {title, description, breadcrumb, body} where body is {kind: \"leaf\", message}, {kind: \"category\", entries: [{key, title, isLeaf}]} or {kind: \"empty\"}. Pass the entry keys as the next path segment to go deeper."
    )]
    fn get_node(
        &self,
        Parameters(req): Parameters<GetNodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let root = self.map.root();
        if resolve(root, &req.path).is_none() {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "No node at '{}'. Call get_node with an empty path to start from the root.",
                breadcrumb(&req.path)
            ))]));
        }

        let viewed = Session::at(req.path).view(root);
        Ok(CallToolResult::success(vec![Content::text(to_json(&viewed.view))]))
    }

    #[tool(description = "List every leaf of the concept map with its path, in document order")]
    fn list_leaves(&self) -> Result<CallToolResult, McpError> {
        let leaves = collect_leaves(self.map.root());
        let text = if leaves.is_empty() {
            "The concept map has no leaves.".to_string()
        } else {
            format_leaves(&leaves)
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Search leaves by title. Case-insensitive substring match.")]
    fn search_leaves(
        &self,
        Parameters(req): Parameters<SearchLeavesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let limit = req.limit.unwrap_or(SEARCH_RESULT_LIMIT);
        let found = search_leaves(self.map.root(), &req.query, limit);

        let text = if req.query.trim().is_empty() {
            format!(
                "There are {} leaves in total. Pass a non-empty query to search.",
                found.total
            )
        } else if found.total == 0 {
            format!("No leaf found for '{}'.", req.query.trim())
        } else {
            let mut text = format!("Found {} leaves:\n{}", found.total, format_leaves(&found.matches));
            if found.total > found.matches.len() {
                text.push_str(&format!(
                    "\n(showing the first {} of {})",
                    found.matches.len(),
                    found.total
                ));
            }
            text
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Get map statistics: total nodes (root excluded), total leaves and title")]
    fn get_stats(&self) -> Result<CallToolResult, McpError> {
        let root = self.map.root();
        let value = serde_json::json!({
            "title": root.title,
            "stats": stats::<String>(root, &[]),
            "relayEnabled": self.relay.is_some(),
            "askEnabled": self.asker.is_some(),
        });
        Ok(CallToolResult::success(vec![Content::text(to_json(&value))]))
    }

    #[tool(description = "Send the message of a leaf to the configured Telegram chat")]
    async fn send_leaf(
        &self,
        Parameters(req): Parameters<SendLeafRequest>,
    ) -> Result<CallToolResult, McpError> {
        let Some(relay) = &self.relay else {
            return Ok(CallToolResult::error(vec![Content::text(RELAY_SETUP_HINT)]));
        };
        let Some(message) = resolve(self.map.root(), &req.path)
            .and_then(|n| n.message())
            .filter(|m| !m.trim().is_empty())
        else {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "'{}' has no message to send.",
                breadcrumb(&req.path)
            ))]));
        };

        match relay.send_one(message).await {
            Ok(()) => {
                tracing::info!(path = ?req.path, "leaf message relayed");
                Ok(CallToolResult::success(vec![Content::text("Message sent!")]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Sending failed: {e}"
            ))])),
        }
    }

    #[tool(
        description = "Ask the AI a question. The answer comes back as short chat-sized messages, one per line block. Unless relay is false, the question and answer are also sent to Telegram when the relay is configured."
    )]
    async fn ask(&self, Parameters(req): Parameters<AskRequest>) -> Result<CallToolResult, McpError> {
        let Some(asker) = &self.asker else {
            return Ok(CallToolResult::error(vec![Content::text(AI_SETUP_HINT)]));
        };

        let answers = match asker.ask(&req.question).await {
            Ok(answers) => answers,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        };

        let mut contents: Vec<Content> = answers.iter().map(|a| Content::text(a.as_str())).collect();
        if let (Some(relay), true) = (&self.relay, req.relay.unwrap_or(true)) {
            let messages = answer_messages(req.question.trim(), &answers);
            let note = match relay.send_many(&messages).await {
                Ok(n) => format!("All {n} messages sent to Telegram."),
                Err(e) => format!("Sending to Telegram failed: {e}"),
            };
            contents.push(Content::text(note));
        }
        Ok(CallToolResult::success(contents))
    }
}

const INSTRUCTIONS: &str = r#"Mappa serves a read-only concept map: a tree of categories whose leaves carry a short message.

Start with `get_stats`, then walk the tree with `get_node` (empty path is the root) or jump straight to leaves with `search_leaves` / `list_leaves`. Paths are arrays of child keys.

`send_leaf` relays a leaf's message to the configured Telegram chat. `ask` puts a free-form question to the AI and, by default, relays the question and answer to the same chat. Both report missing configuration as a tool error with setup instructions."#;

#[tool_handler]
impl ServerHandler for MappaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Serialization error: {}", e))
}

/// One line per leaf: `title  [a > b]`.
fn format_leaves(leaves: &[LeafEntry]) -> String {
    leaves
        .iter()
        .map(|leaf| format!("{}  [{}]", leaf.title, leaf.path.join(" > ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map file: first argument, then `MAPPA_MAP`, then the default next to the binary's cwd.
fn map_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MAPPA_MAP").ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_MAP_FILE.to_string())
        .into()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mappa_mcp=info".parse()?)
                .add_directive("mappa_core=info".parse()?),
        )
        .init();

    let map = load_concept_map(map_path()).inspect_err(|e| tracing::error!("{e}"))?;
    let settings = read_settings();

    let relay = TelegramRelay::from_settings(&settings.relay);
    let asker = if settings.ai_configured() {
        CompletionClient::from_settings(&settings.ai)
            .inspect_err(|e| tracing::warn!(error = %e, "AI questions disabled"))
            .ok()
    } else {
        None
    };
    tracing::info!(
        relay = relay.is_some(),
        ask = asker.is_some(),
        "starting MCP server"
    );

    let service = MappaServer::new(map, relay, asker)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!("MCP server error: {}", e))?;
    service.waiting().await?;
    Ok(())
}
