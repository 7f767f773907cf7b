//! Domain events: what happened while serving a chat turn.
//!
//! The assistant publishes events as it works; the CLI subscribes to print
//! a trace, tests subscribe to assert on degradation paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A FAQ search finished (successfully or not)
    SearchPerformed {
        query: String,
        found: usize,
        total: usize,
        successful: bool,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The assistant produced a final answer for a session
    ResponseGenerated {
        session: String,
        iterations: usize,
        exhausted: bool,
        timestamp: DateTime<Utc>,
    },

    /// The durable conversation store was unreachable and the session
    /// continues on the volatile one
    MemoryFallback {
        session: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The full toolset could not be built and the reduced one is serving
    ReducedMode {
        session: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // no subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_sees_fallback_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::MemoryFallback {
            session: "alice".into(),
            reason: "database is locked".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::MemoryFallback { session, reason, .. } => {
                assert_eq!(session, "alice");
                assert!(reason.contains("locked"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn clones_share_channel() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let clone = bus.clone();
        clone.publish(DomainEvent::ToolExecuted {
            tool_name: "book_status_lookup".into(),
            success: true,
            duration_ms: 3,
            timestamp: Utc::now(),
        });
        assert!(matches!(
            rx.recv().await.unwrap().as_ref(),
            DomainEvent::ToolExecuted { .. }
        ));
    }

    #[test]
    fn publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(DomainEvent::ErrorOccurred {
            context: "test".into(),
            error_message: "nobody listening".into(),
            timestamp: Utc::now(),
        });
    }
}
