//! Per-chat conversation state
//!
//! Sessions live in memory only. Each entry expires `ttl` after it was last
//! written, and the store never holds more than `max_entries` chats: writing a
//! new chat into a full store evicts the least recently written one.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Where a chat is in the ask/rate cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatState {
    #[default]
    Idle,
    /// An answer was sent and can be rated
    AwaitingReaction,
}

/// What the bot remembers about a chat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSession {
    pub state: ChatState,
    pub last_question: Option<String>,
    pub last_context: Option<String>,
    pub last_answer: Option<String>,
}

impl ChatSession {
    /// Session right after an answer was delivered
    pub fn answered(question: &str, context: String, answer: &str) -> Self {
        Self {
            state: ChatState::AwaitingReaction,
            last_question: Some(question.to_string()),
            last_context: Some(context),
            last_answer: Some(answer.to_string()),
        }
    }
}

struct SessionEntry {
    session: ChatSession,
    touched: Instant,
}

/// Bounded, expiring map from chat id to session
pub struct SessionStore {
    entries: DashMap<i64, SessionEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Live session for `chat_id`; an expired one is dropped
    pub fn get(&self, chat_id: i64) -> Option<ChatSession> {
        {
            let entry = self.entries.get(&chat_id)?;
            if entry.touched.elapsed() <= self.ttl {
                return Some(entry.session.clone());
            }
        }

        self.entries.remove(&chat_id);
        tracing::debug!(chat_id, "Session expired");
        None
    }

    /// Store `session`, evicting the oldest chat when full
    pub fn put(&self, chat_id: i64, session: ChatSession) {
        if !self.entries.contains_key(&chat_id) && self.entries.len() >= self.max_entries {
            self.evict_expired();
            if self.entries.len() >= self.max_entries {
                self.evict_oldest();
            }
        }

        self.entries.insert(
            chat_id,
            SessionEntry {
                session,
                touched: Instant::now(),
            },
        );
    }

    /// Change the state of an existing session, keeping its stored exchange
    pub fn set_state(&self, chat_id: i64, state: ChatState) {
        if let Some(mut entry) = self.entries.get_mut(&chat_id) {
            entry.session.state = state;
        }
    }

    pub fn remove(&self, chat_id: i64) -> Option<ChatSession> {
        self.entries.remove(&chat_id).map(|(_, entry)| entry.session)
    }

    /// Drop every expired session, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.touched.elapsed() <= self.ttl);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!("Evicted {} expired sessions", removed);
        }
        removed
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.touched)
            .map(|entry| *entry.key());

        if let Some(chat_id) = oldest {
            self.entries.remove(&chat_id);
            tracing::debug!(chat_id, "Evicted oldest session");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answered(q: &str) -> ChatSession {
        ChatSession::answered(q, "ctx".to_string(), "ans")
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_on_access() {
        let store = SessionStore::new(Duration::from_secs(60), 10);
        store.put(1, answered("q"));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(store.get(1).is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(store.get(1).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest() {
        let store = SessionStore::new(Duration::from_secs(3600), 2);
        store.put(1, answered("first"));
        tokio::time::advance(Duration::from_secs(1)).await;
        store.put(2, answered("second"));
        tokio::time::advance(Duration::from_secs(1)).await;
        store.put(3, answered("third"));

        assert_eq!(store.len(), 2);
        assert!(store.get(1).is_none());
        assert!(store.get(2).is_some());
        assert!(store.get(3).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired_sweep() {
        let store = SessionStore::new(Duration::from_secs(10), 100);
        store.put(1, answered("old"));
        tokio::time::advance(Duration::from_secs(11)).await;
        store.put(2, answered("new"));

        assert_eq!(store.evict_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(2).is_some());
    }

    #[test]
    fn test_set_state_keeps_exchange() {
        let store = SessionStore::new(Duration::from_secs(3600), 10);
        store.put(7, answered("why"));
        store.set_state(7, ChatState::Idle);
        let session = store.get(7).unwrap();
        assert_eq!(session.state, ChatState::Idle);
        assert_eq!(session.last_question.as_deref(), Some("why"));
    }
}
