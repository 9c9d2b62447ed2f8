use std::sync::Arc;

use crate::chat::history::ConversationStore;
use crate::config::Config;
use crate::llm_cli::ModelInvoker;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable model capability. Production wires the Claude CLI; tests
    /// inject deterministic doubles.
    pub invoker: Arc<dyn ModelInvoker>,
    /// Process-local chat history, capped and idle-expired.
    pub conversations: Arc<ConversationStore>,
}
