//! Application event bus.
//!
//! Decoupled components (a cart badge, a toast area, a search box) subscribe
//! here instead of listening for ambient window events. The bus is a
//! `tokio::sync::broadcast` channel: publishing never blocks, each subscriber
//! gets every event published after it subscribed, and a subscriber that
//! falls behind skips ahead with a warning.

use std::sync::Arc;

use farm_connect_core::{CartItem, Notification, NotificationId, UserId, WishlistItem};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

use crate::session::{LogoutReason, SessionStatus};

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 64;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A non-blocking, user-facing message (toast/banner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Everything published on the bus.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The cart changed; carries the full new collection.
    CartUpdated(Vec<CartItem>),
    /// The wishlist changed; carries the full new collection.
    WishlistUpdated(Vec<WishlistItem>),
    /// Show a notice to the user.
    ShowNotification(Notice),
    /// A search was submitted from anywhere in the app.
    GlobalSearch(String),
    /// The session state machine moved to a new state.
    SessionChanged(SessionStatus),
    /// The session was ended by policy; the user must sign in again.
    LoginRequired { reason: LogoutReason },
    /// A notification arrived on the real-time channel.
    NotificationReceived(Notification),
    /// A notification was marked read (relayed to the backend as `notificationRead`).
    NotificationRead { id: NotificationId, user_id: UserId },
}

/// Publish/subscribe hub shared by every store.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: AppEvent) {
        match self.tx.send(event) {
            Ok(receivers) => debug!(receivers, "Published app event"),
            Err(_) => debug!("Published app event with no subscribers"),
        }
    }

    /// Publish a user-facing notice.
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.publish(AppEvent::ShowNotification(Notice::new(level, message)));
    }

    /// Publish a global search query. Blank queries are ignored.
    pub fn search(&self, query: &str) {
        let query = query.trim();
        if !query.is_empty() {
            self.publish(AppEvent::GlobalSearch(query.to_owned()));
        }
    }

    /// Receiver for every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Current number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Run `handler` for every event on a background task.
    ///
    /// Returns an [`EventSubscription`] that stops the task when dropped.
    /// Must be called from within a Tokio runtime.
    pub fn on_event<F>(&self, handler: F) -> EventSubscription
    where
        F: Fn(AppEvent) + Send + Sync + 'static,
    {
        let mut rx = self.subscribe();
        let handler = Arc::new(handler);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = rx.recv() => {
                        match result {
                            Ok(event) => handler(event),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!(dropped = n, "Event subscriber lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    _ = &mut cancel_rx => break,
                }
            }
        });

        EventSubscription {
            cancel_tx: Some(cancel_tx),
        }
    }
}

/// Handle for a callback registered with [`EventBus::on_event`].
pub struct EventSubscription {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl EventSubscription {
    /// Explicitly cancels the subscription, equivalent to dropping it.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("active", &self.cancel_tx.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::default();
        bus.notify(NoticeLevel::Info, "nobody listening");
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.search("  tomatoes ");
        bus.search("   ");
        bus.notify(NoticeLevel::Warning, "slow network");

        assert!(matches!(rx.recv().await.unwrap(), AppEvent::GlobalSearch(q) if q == "tomatoes"));
        match rx.recv().await.unwrap() {
            AppEvent::ShowNotification(notice) => {
                assert_eq!(notice.level, NoticeLevel::Warning);
                assert_eq!(notice.message, "slow network");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_on_event_stops_after_unsubscribe() {
        let bus = EventBus::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let subscription = bus.on_event(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.search("carrots");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        tokio::time::sleep(Duration::from_millis(50)).await;
        bus.search("beets");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
