//! Notification inbox for the signed-in user.
//!
//! The real-time channel delivers `newNotification` payloads to the room
//! of the joined user. The inbox keeps them, tracks read state, and
//! publishes `NotificationRead` when one is marked read (the outbound
//! `notificationRead` message).
//!
//! The inbox is bounded. Past its capacity the oldest read notification is
//! evicted first, then the oldest unread one.

use std::sync::Arc;

use farm_connect_core::{Notification, NotificationId, UserId};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::events::{AppEvent, EventBus};

/// Notifications kept per user by [`NotificationInbox::new`].
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct NotificationInbox {
    inner: Arc<InboxInner>,
}

struct InboxInner {
    events: EventBus,
    capacity: usize,
    state: Mutex<InboxState>,
}

#[derive(Default)]
struct InboxState {
    user: Option<UserId>,
    items: Vec<Notification>,
}

impl std::fmt::Debug for NotificationInbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("NotificationInbox")
            .field("user", &state.user)
            .field("len", &state.items.len())
            .finish()
    }
}

impl NotificationInbox {
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self::with_capacity(events, DEFAULT_CAPACITY)
    }

    /// Inbox holding at most `capacity` notifications (at least one).
    #[must_use]
    pub fn with_capacity(events: EventBus, capacity: usize) -> Self {
        Self {
            inner: Arc::new(InboxInner {
                events,
                capacity: capacity.max(1),
                state: Mutex::new(InboxState::default()),
            }),
        }
    }

    /// Join `user`'s room. Switching users drops the previous inbox.
    pub fn join(&self, user: UserId) {
        let mut state = self.inner.state.lock();
        if state.user.as_ref() == Some(&user) {
            return;
        }
        info!(user_id = %user, "Joined notification room");
        state.items.clear();
        state.user = Some(user);
    }

    /// Leave the room and forget every notification.
    pub fn leave(&self) {
        let mut state = self.inner.state.lock();
        if let Some(user) = state.user.take() {
            info!(user_id = %user, "Left notification room");
        }
        state.items.clear();
    }

    #[must_use]
    pub fn joined_user(&self) -> Option<UserId> {
        self.inner.state.lock().user.clone()
    }

    /// Accept a delivered notification.
    ///
    /// Returns `false` (and ignores it) when nobody is joined, it belongs to
    /// another user, or its id was already received.
    pub fn receive(&self, notification: Notification) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.user.as_ref() != Some(&notification.user_id) {
                debug!(id = %notification.id, "Ignoring notification for another user");
                return false;
            }
            if state.items.iter().any(|n| n.id == notification.id) {
                debug!(id = %notification.id, "Ignoring duplicate notification");
                return false;
            }
            state.items.push(notification.clone());
            evict_oldest(&mut state.items, self.inner.capacity);
        }
        self.inner
            .events
            .publish(AppEvent::NotificationReceived(notification));
        true
    }

    /// Mark one notification read.
    ///
    /// Unknown or already-read ids are a no-op returning `false`.
    pub fn mark_read(&self, id: &NotificationId) -> bool {
        let user_id = {
            let mut state = self.inner.state.lock();
            let Some(notification) = state.items.iter_mut().find(|n| &n.id == id && !n.read)
            else {
                return false;
            };
            notification.read = true;
            notification.user_id.clone()
        };
        self.inner.events.publish(AppEvent::NotificationRead {
            id: id.clone(),
            user_id,
        });
        true
    }

    /// Mark everything read. Returns how many changed.
    pub fn mark_all_read(&self) -> usize {
        let unread: Vec<NotificationId> = self
            .inner
            .state
            .lock()
            .items
            .iter()
            .filter(|n| !n.read)
            .map(|n| n.id.clone())
            .collect();
        unread.iter().filter(|id| self.mark_read(id)).count()
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .items
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    /// Every notification, newest first.
    #[must_use]
    pub fn list(&self) -> Vec<Notification> {
        let mut items = self.inner.state.lock().items.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }
}

/// Drop read notifications oldest first, then unread ones, until `items` fits.
fn evict_oldest(items: &mut Vec<Notification>, capacity: usize) {
    while items.len() > capacity {
        let oldest = items.iter().position(|n| n.read).unwrap_or(0);
        let evicted = items.remove(oldest);
        debug!(id = %evicted.id, read = evicted.read, "Inbox full, evicted notification");
    }
}
