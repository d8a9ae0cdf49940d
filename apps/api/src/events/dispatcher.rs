use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::events::{DomainEvent, EventSink};
use crate::store::SkillStore;

/// Production event sink. Events are queued on an unbounded channel and a
/// background task persists each one as a notification.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::UnboundedSender<DomainEvent>,
}

impl NotificationDispatcher {
    /// Starts the delivery task. It exits once every dispatcher clone is dropped.
    pub fn spawn(store: Arc<dyn SkillStore>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<DomainEvent>();

        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let name = event.name();
                let user_id = event.user_id();
                match store.create_notification(event.to_notification()).await {
                    Ok(n) => debug!(event = name, %user_id, notification_id = %n.id, "Notification stored"),
                    Err(e) => error!(event = name, %user_id, "Failed to store notification: {e}"),
                }
            }
            debug!("Notification dispatcher stopped");
        });

        (Self { sender }, worker)
    }
}

impl EventSink for NotificationDispatcher {
    fn emit(&self, event: DomainEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!(event = e.0.name(), "Notification channel closed; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::events::ProfileComplete;
    use crate::models::notification::NotificationKind;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_events_become_notifications() {
        let store = Arc::new(MemoryStore::new());
        let (dispatcher, worker) = NotificationDispatcher::spawn(store.clone());
        let user_id = Uuid::new_v4();

        dispatcher.emit(DomainEvent::ProfileComplete(ProfileComplete {
            user_id,
            profile_id: Uuid::new_v4(),
        }));
        drop(dispatcher);
        worker.await.unwrap();

        let stored = store.list_notifications(user_id, 50).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind, NotificationKind::ProfileComplete);
        assert!(!stored[0].is_read);
    }
}
