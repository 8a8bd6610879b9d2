//! Live fan-out of chat messages.

use crate::infrastructure::entities::Message;
use di::inject;
use di::injectable;
use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

/// One broadcast channel per conversation that currently has listeners.
pub struct ChatHub {
    channels: Mutex<HashMap<Uuid, broadcast::Sender<Message>>>,
}

#[injectable]
impl ChatHub {
    #[inject]
    pub fn create() -> ChatHub {
        ChatHub {
            channels: Mutex::new(HashMap::new()),
        }
    }
}

impl ChatHub {
    pub fn subscribe(&self, conversation_id: Uuid) -> broadcast::Receiver<Message> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        // streams that went away without a publish in between
        channels.retain(|_, sender| sender.receiver_count() > 0);

        channels
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn publish(&self, message: &Message) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(sender) = channels.get(&message.conversation_id) {
            if sender.send(message.clone()).is_err() {
                debug!(
                    "no listeners left on conversation {}",
                    message.conversation_id
                );
                channels.remove(&message.conversation_id);
            }
        }
    }

    /// Drops the channel of a conversation; its open streams end.
    pub fn close(&self, conversation_id: Uuid) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());

        if channels.remove(&conversation_id).is_some() {
            debug!("closed live channel of conversation {conversation_id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::entities::MessageKind;
    use chrono::Utc;

    fn message(conversation_id: Uuid, text: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_email: "user@example.com".to_owned(),
            kind: MessageKind::User,
            created_at: Utc::now(),
            text: text.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_message() {
        let hub = ChatHub::create();
        let conversation_id = Uuid::new_v4();
        let mut receiver = hub.subscribe(conversation_id);

        hub.publish(&message(conversation_id, "Hello"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.text, "Hello");
    }

    #[tokio::test]
    async fn test_other_conversations_are_not_delivered() {
        let hub = ChatHub::create();
        let conversation_id = Uuid::new_v4();
        let mut receiver = hub.subscribe(conversation_id);

        hub.publish(&message(Uuid::new_v4(), "elsewhere"));
        hub.publish(&message(conversation_id, "here"));

        assert_eq!(receiver.recv().await.unwrap().text, "here");
    }

    #[test]
    fn test_channel_dropped_without_listeners() {
        let hub = ChatHub::create();
        let conversation_id = Uuid::new_v4();
        drop(hub.subscribe(conversation_id));

        hub.publish(&message(conversation_id, "nobody listens"));

        assert!(hub.channels.lock().unwrap().is_empty());
    }

    #[test]
    fn test_abandoned_channels_are_pruned_on_subscribe() {
        let hub = ChatHub::create();

        for _ in 0..1000 {
            drop(hub.subscribe(Uuid::new_v4()));
        }
        let _receiver = hub.subscribe(Uuid::new_v4());

        assert_eq!(hub.channels.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_live_channels_survive_pruning() {
        let hub = ChatHub::create();
        let conversation_id = Uuid::new_v4();
        let _listener = hub.subscribe(conversation_id);

        drop(hub.subscribe(Uuid::new_v4()));
        let _other = hub.subscribe(Uuid::new_v4());

        let channels = hub.channels.lock().unwrap();
        assert_eq!(channels.len(), 2);
        assert!(channels.contains_key(&conversation_id));
    }

    #[tokio::test]
    async fn test_close_ends_open_streams() {
        let hub = ChatHub::create();
        let conversation_id = Uuid::new_v4();
        let mut receiver = hub.subscribe(conversation_id);

        hub.close(conversation_id);

        assert_eq!(
            receiver.recv().await.unwrap_err(),
            broadcast::error::RecvError::Closed
        );
        assert!(hub.channels.lock().unwrap().is_empty());
    }
}
