//! In-memory conversation history with a hard cap and idle expiry.
//!
//! Process-local only: history is lost on restart. Sessions idle past the
//! TTL are pruned lazily on the next write.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Hard cap: 10 exchanges, question + answer each.
pub const MAX_TURNS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
        }
    }
}

struct Session {
    turns: Vec<ChatTurn>,
    last_active: Instant,
}

/// Keyed conversation store shared across chat requests.
pub struct ConversationStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl ConversationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the stored turns for a conversation, oldest first.
    /// An expired or unknown conversation yields an empty history.
    pub async fn history(&self, conversation_id: &str) -> Vec<ChatTurn> {
        let sessions = self.sessions.read().await;
        match sessions.get(conversation_id) {
            Some(session) if session.last_active.elapsed() < self.ttl => session.turns.clone(),
            _ => Vec::new(),
        }
    }

    /// Appends one question/answer exchange, enforcing the cap by dropping
    /// the oldest turns.
    pub async fn append_exchange(&self, conversation_id: &str, question: &str, answer: &str) {
        let mut sessions = self.sessions.write().await;

        let ttl = self.ttl;
        sessions.retain(|_, session| session.last_active.elapsed() < ttl);

        let session = sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| Session {
                turns: Vec::new(),
                last_active: Instant::now(),
            });

        session.turns.push(ChatTurn::user(question));
        session.turns.push(ChatTurn::assistant(answer));
        if session.turns.len() > MAX_TURNS {
            let excess = session.turns.len() - MAX_TURNS;
            session.turns.drain(..excess);
        }
        session.last_active = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_caps_at_ten_exchanges() {
        let store = ConversationStore::new(Duration::from_secs(3600));

        for i in 1..=11 {
            store
                .append_exchange("conv-1", &format!("question {i}"), &format!("answer {i}"))
                .await;
        }

        let turns = store.history("conv-1").await;
        assert_eq!(turns.len(), MAX_TURNS);
        // Exchange 1 fell off; the window starts at exchange 2.
        assert_eq!(turns[0].content, "question 2");
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns.last().unwrap().content, "answer 11");
        assert_eq!(turns.last().unwrap().role, "assistant");
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let store = ConversationStore::new(Duration::from_secs(3600));
        store.append_exchange("a", "hi", "hello").await;
        store.append_exchange("b", "hey", "yo").await;

        assert_eq!(store.history("a").await.len(), 2);
        assert_eq!(store.history("b").await.len(), 2);
        assert!(store.history("c").await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_history_is_empty() {
        let store = ConversationStore::new(Duration::ZERO);
        store.append_exchange("conv-1", "hi", "hello").await;
        assert!(store.history("conv-1").await.is_empty());
    }
}
