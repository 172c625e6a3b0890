//! Fire-and-forget broadcast over a tokio channel. Presentation-layer
//! collaborators (the chat room, the moderation dashboard) subscribe;
//! a send with nobody listening is dropped, never an error for the caller.

use async_trait::async_trait;
use domains::{BroadcastEvent, Notifier};
use tokio::sync::broadcast;

pub struct ChannelNotifier {
    tx: broadcast::Sender<BroadcastEvent>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn broadcast(&self, event: BroadcastEvent) {
        // No receivers is normal at startup; at-most-once either way.
        if let Err(err) = self.tx.send(event) {
            tracing::debug!(%err, "broadcast dropped: no receivers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn broadcast_without_receivers_never_fails_the_caller() {
        let notifier = ChannelNotifier::new(8);
        notifier
            .broadcast(BroadcastEvent::Redeem {
                user_id: Uuid::new_v4(),
                redeem_id: "tts_message".into(),
                cost: 100,
            })
            .await;
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let notifier = ChannelNotifier::new(8);
        let mut rx = notifier.subscribe();

        let user = Uuid::new_v4();
        notifier
            .broadcast(BroadcastEvent::Timeout {
                user_id: user,
                duration_minutes: 5,
                reason: "test".into(),
                kind: domains::BanKind::AutomodBan,
            })
            .await;

        match rx.recv().await.unwrap() {
            BroadcastEvent::Timeout { user_id, duration_minutes, .. } => {
                assert_eq!(user_id, user);
                assert_eq!(duration_minutes, 5);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
