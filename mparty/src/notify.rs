//! Change notifications.
//!
//! Services publish a [`DomainEvent`] after every successful mutation so that
//! presentation layers can refresh whatever they are showing.

use crate::models::{EventId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity; slow subscribers lag rather than block publishers
pub const DEFAULT_CAPACITY: usize = 256;

/// Something that changed in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    UserRegistered { user_id: UserId },
    ProfileUpdated { user_id: UserId },
    EventCreated { event_id: EventId },
    EventUpdated { event_id: EventId },
    PlayerJoined { event_id: EventId, user_id: UserId },
    PlayerLeft { event_id: EventId, user_id: UserId },
    TournamentStarted { event_id: EventId },
    TournamentFinished { event_id: EventId },
    RankingsRefreshed { updated: usize },
}

/// Broadcast bus for [`DomainEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers; having none is fine
    pub fn publish(&self, event: DomainEvent) {
        if self.sender.send(event).is_err() {
            log::trace!("No subscribers for domain event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::EventCreated { event_id: "e1".into() });
        bus.publish(DomainEvent::TournamentStarted { event_id: "e1".into() });

        assert_eq!(
            rx.recv().await.unwrap(),
            DomainEvent::EventCreated { event_id: "e1".into() }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            DomainEvent::TournamentStarted { event_id: "e1".into() }
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new(4);
        bus.publish(DomainEvent::RankingsRefreshed { updated: 0 });
    }
}
