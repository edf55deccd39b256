//! Conversation history
//!
//! Fixed-capacity ring buffer per conversation, FIFO eviction. The buffer is
//! the working LLM context; the full transcript lives in Postgres.

use crate::types::LLMMessage;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug)]
pub struct ConversationHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest when at capacity.
    pub fn push(&mut self, role: impl Into<String>, content: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            role: role.into(),
            content: content.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest-first, ready for prompt assembly.
    pub fn as_messages(&self) -> Vec<LLMMessage> {
        self.entries
            .iter()
            .map(|e| LLMMessage::new(e.role.clone(), e.content.clone()))
            .collect()
    }
}

/// Shared per-conversation history buffers.
pub struct SessionStore {
    inner: RwLock<HashMap<Uuid, ConversationHistory>>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub async fn append(&self, conversation_id: Uuid, role: &str, content: &str) {
        let mut sessions = self.inner.write().await;
        sessions
            .entry(conversation_id)
            .or_insert_with(|| ConversationHistory::with_capacity(self.capacity))
            .push(role, content);
    }

    pub async fn messages(&self, conversation_id: Uuid) -> Vec<LLMMessage> {
        let sessions = self.inner.read().await;
        sessions
            .get(&conversation_id)
            .map(|h| h.as_messages())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest_at_capacity() {
        let mut history = ConversationHistory::with_capacity(3);
        history.push("user", "one");
        history.push("assistant", "two");
        history.push("user", "three");
        history.push("assistant", "four");

        assert_eq!(history.len(), 3);
        let messages = history.as_messages();
        assert_eq!(messages[0].content, "two");
        assert_eq!(messages[2].content, "four");
    }

    #[test]
    fn test_as_messages_preserves_order_and_roles() {
        let mut history = ConversationHistory::with_capacity(5);
        history.push("user", "hello");
        history.push("assistant", "hi there");

        let messages = history.as_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let mut history = ConversationHistory::with_capacity(0);
        history.push("user", "a");
        history.push("user", "b");
        assert_eq!(history.len(), 1);
        assert_eq!(history.as_messages()[0].content, "b");
    }

    #[tokio::test]
    async fn test_session_store_isolates_conversations() {
        let store = SessionStore::new(10);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.append(a, "user", "question about maize").await;
        store.append(b, "user", "question about beans").await;

        assert_eq!(store.messages(a).await.len(), 1);
        assert_eq!(store.messages(b).await.len(), 1);
        assert_eq!(store.messages(Uuid::new_v4()).await.len(), 0);
    }
}
