//! Chat over a parsed candidate profile.
//!
//! Each request builds a context string from the candidate mapping and the
//! stored conversation turns, asks the model once with a short timeout, and
//! records the exchange. No persistence; history dies with the process.

pub mod handlers;
pub mod history;
pub mod prompts;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::llm_cli::{InvokeError, ModelInvoker};
use history::{ChatTurn, ConversationStore};
use prompts::{CHAT_PREAMBLE, CHAT_PROMPT_TEMPLATE};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub candidate: Value,
    #[serde(default, rename = "conversationId")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
}

/// Answers one chat message. Mints a conversation id when the caller did
/// not supply one, and appends the exchange to the store on success.
pub async fn respond(
    invoker: &dyn ModelInvoker,
    store: &ConversationStore,
    timeout: Duration,
    request: &ChatRequest,
) -> Result<ChatResponse, InvokeError> {
    let conversation_id = match request.conversation_id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    };

    let turns = store.history(&conversation_id).await;
    let prompt = CHAT_PROMPT_TEMPLATE
        .replace("{preamble}", CHAT_PREAMBLE)
        .replace("{candidate_context}", &candidate_context(&request.candidate))
        .replace("{history}", &history_block(&turns))
        .replace("{question}", &request.message);

    let answer = invoker.query(&prompt, timeout).await?;

    store
        .append_exchange(&conversation_id, &request.message, &answer)
        .await;

    Ok(ChatResponse {
        success: true,
        response: answer,
        conversation_id,
    })
}

/// Summarizes the candidate mapping for the prompt: identity first, then
/// headline counts and a few concrete skills.
fn candidate_context(candidate: &Value) -> String {
    let mut lines = Vec::new();

    for (label, key) in [("Name", "name"), ("Email", "email"), ("Phone", "phone")] {
        if let Some(value) = candidate.get(key).and_then(|v| v.as_str()) {
            lines.push(format!("{label}: {value}"));
        }
    }
    if let Some(summary) = candidate.get("summary").and_then(|v| v.as_str()) {
        lines.push(format!("Summary: {summary}"));
    }

    if let Some(skills) = candidate.get("skills").and_then(|v| v.as_array()) {
        let examples: Vec<&str> = skills.iter().filter_map(|s| s.as_str()).take(8).collect();
        lines.push(format!(
            "Skills ({} total): {}",
            skills.len(),
            examples.join(", ")
        ));
    }

    if let Some(experience) = candidate.get("experience").and_then(|v| v.as_array()) {
        lines.push(format!("Experience entries: {}", experience.len()));
        if let Some(recent) = experience.first() {
            let position = recent.get("position").and_then(|v| v.as_str()).unwrap_or("?");
            let company = recent.get("company").and_then(|v| v.as_str()).unwrap_or("?");
            lines.push(format!("Most recent role: {position} at {company}"));
        }
    }

    if let Some(education) = candidate.get("education").and_then(|v| v.as_array()) {
        lines.push(format!("Education entries: {}", education.len()));
    }

    if lines.is_empty() {
        lines.push("(no candidate data provided)".to_string());
    }

    // Full detail for anything the summary lines left out.
    if let Ok(raw) = serde_json::to_string(candidate) {
        lines.push(format!("Raw profile JSON: {raw}"));
    }

    lines.join("\n")
}

fn history_block(turns: &[ChatTurn]) -> String {
    if turns.is_empty() {
        return "(none)".to_string();
    }
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}
