//! Per-session conversation memory with a volatile fallback.
//!
//! The durable store is probed once when a session starts. If it does not
//! respond, the session runs on the process-local fallback store for its
//! whole lifetime. The caller is never told; the switch is logged and
//! published as a `MemoryFallback` event.

use chrono::Utc;
use folio_core::event::{DomainEvent, EventBus};
use folio_core::memory::{ConversationStore, SessionId, Turn, TurnRole};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SessionMemory {
    session: SessionId,
    store: Arc<dyn ConversationStore>,
    fallback: bool,
    history_limit: usize,
}

impl SessionMemory {
    pub async fn start(
        durable: Arc<dyn ConversationStore>,
        fallback: Arc<dyn ConversationStore>,
        session: SessionId,
        events: &EventBus,
    ) -> Self {
        let (store, on_fallback) = match durable.health_check().await {
            Ok(()) => (durable, false),
            Err(e) => {
                warn!(
                    session = %session,
                    store = durable.name(),
                    fallback = fallback.name(),
                    error = %e,
                    "Durable conversation store unavailable, using fallback"
                );
                events.publish(DomainEvent::MemoryFallback {
                    session: session.to_string(),
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                (fallback, true)
            }
        };

        debug!(session = %session, store = store.name(), "Session memory started");
        Self {
            session,
            store,
            fallback: on_fallback,
            history_limit: 20,
        }
    }

    /// Cap on the number of most recent turns handed to the model.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn backend(&self) -> &str {
        self.store.name()
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// The most recent turns, oldest first. A failed load yields no history.
    ///
    /// The window never opens on an assistant turn, so it may hold one turn
    /// fewer than the limit.
    pub async fn history(&self) -> Vec<Turn> {
        match self.store.load(&self.session).await {
            Ok(mut turns) => {
                let mut start = turns.len().saturating_sub(self.history_limit);
                while turns.get(start).is_some_and(|t| t.role == TurnRole::Assistant) {
                    start += 1;
                }
                turns.drain(..start);
                turns
            }
            Err(e) => {
                warn!(session = %self.session, error = %e, "Failed to load conversation history");
                Vec::new()
            }
        }
    }

    /// Append the user turn and the assistant turn. Failures are logged only.
    pub async fn record_exchange(&self, query: &str, answer: &str) {
        for turn in [Turn::user(query), Turn::assistant(answer)] {
            if let Err(e) = self.store.append(&self.session, turn).await {
                warn!(session = %self.session, error = %e, "Failed to save conversation turn");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folio_core::error::MemoryError;
    use folio_memory::{FileConversationStore, InMemoryConversationStore};

    struct Unreachable;

    #[async_trait]
    impl ConversationStore for Unreachable {
        fn name(&self) -> &str {
            "unreachable"
        }
        async fn append(&self, _: &SessionId, _: Turn) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("connection refused".into()))
        }
        async fn load(&self, _: &SessionId) -> Result<Vec<Turn>, MemoryError> {
            Err(MemoryError::Storage("connection refused".into()))
        }
        async fn health_check(&self) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn healthy_durable_store_is_used() {
        let durable = Arc::new(InMemoryConversationStore::new());
        let fallback = Arc::new(InMemoryConversationStore::new());
        let memory = SessionMemory::start(
            durable.clone(),
            fallback.clone(),
            SessionId::from("alice"),
            &EventBus::default(),
        )
        .await;

        memory.record_exchange("q", "a").await;
        assert!(!memory.is_fallback());
        assert_eq!(durable.session_count().await, 1);
        assert_eq!(fallback.session_count().await, 0);
    }

    #[tokio::test]
    async fn unreachable_store_falls_back_and_publishes() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let fallback = Arc::new(InMemoryConversationStore::new());

        let memory = SessionMemory::start(
            Arc::new(Unreachable),
            fallback.clone(),
            SessionId::from("alice"),
            &bus,
        )
        .await;
        assert!(memory.is_fallback());
        assert_eq!(memory.backend(), "in_memory");

        memory.record_exchange("What's my book status?", "In editing.").await;
        let history = memory.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "What's my book status?");

        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::MemoryFallback { session, reason, .. } => {
                assert_eq!(session, "alice");
                assert!(reason.contains("connection refused"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn history_keeps_most_recent_turns() {
        let store = Arc::new(InMemoryConversationStore::new());
        let memory = SessionMemory::start(
            store.clone(),
            Arc::new(InMemoryConversationStore::new()),
            SessionId::from("bob"),
            &EventBus::default(),
        )
        .await
        .with_history_limit(4);

        for i in 0..5 {
            memory.record_exchange(&format!("q{i}"), &format!("a{i}")).await;
        }
        let contents: Vec<String> = memory.history().await.into_iter().map(|t| t.content).collect();
        assert_eq!(contents, vec!["q3", "a3", "q4", "a4"]);
    }

    #[tokio::test]
    async fn history_window_starts_on_a_user_turn() {
        let store = Arc::new(InMemoryConversationStore::new());
        let memory = SessionMemory::start(
            store.clone(),
            Arc::new(InMemoryConversationStore::new()),
            SessionId::from("bob"),
            &EventBus::default(),
        )
        .await
        .with_history_limit(3);

        for i in 0..5 {
            memory.record_exchange(&format!("q{i}"), &format!("a{i}")).await;
        }
        let history = memory.history().await;
        assert_eq!(history[0].role, TurnRole::User);
        let contents: Vec<String> = history.into_iter().map(|t| t.content).collect();
        assert_eq!(contents, vec!["q4", "a4"]);
    }

    async fn start_in(dir: &std::path::Path) -> SessionMemory {
        SessionMemory::start(
            Arc::new(FileConversationStore::new(dir)),
            Arc::new(InMemoryConversationStore::new()),
            SessionId::from("carol"),
            &EventBus::default(),
        )
        .await
    }

    #[tokio::test]
    async fn file_store_persists_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        start_in(dir.path())
            .await
            .record_exchange("first question", "first answer")
            .await;

        let history = start_in(dir.path()).await.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "first answer");
    }
}
