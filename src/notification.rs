//! Fan-out of server notifications to registered listeners.
//!
//! The dispatcher hands every decoded event to `NotificationRouter::dispatch`,
//! which looks up the listeners registered for the event's category and
//! calls them. Two kinds of listener exist:
//!
//! - callbacks, invoked inline on the routing task of the frame
//! - bounded channel subscriptions, fed with `try_send`; when a subscriber
//!   falls behind its notifications are dropped with a WARN log
//!
//! Dispatch never blocks on a listener, so a slow subscriber cannot stall
//! frame routing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use log::{debug, warn};
use tokio::sync::mpsc;

use crate::protocol::api::{Notification, NotificationType};

const LOG_TARGET: &str = "iterm2_client::notification";

/// Category of a server notification, used as the routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    Keystroke,
    ScreenUpdate,
    NewSession,
    TerminateSession,
    LayoutChange,
}

impl NotificationCategory {
    /// Category of the first populated field, `None` for an empty notification.
    pub fn of(notification: &Notification) -> Option<Self> {
        if notification.keystroke_notification.is_some() {
            Some(Self::Keystroke)
        } else if notification.screen_update_notification.is_some() {
            Some(Self::ScreenUpdate)
        } else if notification.new_session_notification.is_some() {
            Some(Self::NewSession)
        } else if notification.terminate_session_notification.is_some() {
            Some(Self::TerminateSession)
        } else if notification.layout_changed_notification.is_some() {
            Some(Self::LayoutChange)
        } else {
            None
        }
    }

    /// Subscription type to request from the server for this category.
    pub fn notification_type(self) -> NotificationType {
        match self {
            Self::Keystroke => NotificationType::NotifyOnKeystroke,
            Self::ScreenUpdate => NotificationType::NotifyOnScreenUpdate,
            Self::NewSession => NotificationType::NotifyOnNewSession,
            Self::TerminateSession => NotificationType::NotifyOnTerminateSession,
            Self::LayoutChange => NotificationType::NotifyOnLayoutChange,
        }
    }
}

/// Callback invoked for each matching notification.
pub type NotificationCallback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Handle returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
enum Listener {
    Callback(NotificationCallback),
    Channel(mpsc::Sender<Notification>),
}

/// Routes notifications to listeners by category.
pub struct NotificationRouter {
    listeners: DashMap<NotificationCategory, Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl Default for NotificationRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationRouter {
    /// Create a router with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Register a callback for one category.
    pub fn register<F>(&self, category: NotificationCategory, callback: F) -> ListenerId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.insert(category, Listener::Callback(Arc::new(callback)))
    }

    /// Subscribe to one category through a bounded channel.
    ///
    /// Notifications that do not fit in the channel are dropped.
    pub fn subscribe(
        &self,
        category: NotificationCategory,
        capacity: usize,
    ) -> (ListenerId, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = self.insert(category, Listener::Channel(tx));
        (id, rx)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut removed = false;
        for mut entry in self.listeners.iter_mut() {
            let before = entry.len();
            entry.retain(|(listener_id, _)| *listener_id != id);
            removed |= entry.len() != before;
        }
        removed
    }

    /// Number of listeners registered for a category.
    pub fn listener_count(&self, category: NotificationCategory) -> usize {
        self.listeners
            .get(&category)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    /// Hand a notification to every listener of its category.
    ///
    /// Returns how many listeners accepted it.
    pub fn dispatch(&self, notification: Notification) -> usize {
        let Some(category) = NotificationCategory::of(&notification) else {
            debug!(
                target: LOG_TARGET,
                "Ignoring notification without a known category"
            );
            return 0;
        };

        // Snapshot so callbacks can (un)register without deadlocking the shard.
        let listeners: Vec<(ListenerId, Listener)> = match self.listeners.get(&category) {
            Some(entry) => entry.value().clone(),
            None => Vec::new(),
        };

        if listeners.is_empty() {
            debug!(
                target: LOG_TARGET,
                "No listener for {:?} notification, dropping",
                category
            );
            return 0;
        }

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, listener) in listeners {
            match listener {
                Listener::Callback(callback) => {
                    callback(&notification);
                    delivered += 1;
                }
                Listener::Channel(tx) => match tx.try_send(notification.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(
                            target: LOG_TARGET,
                            "Subscriber queue full, dropping {:?} notification",
                            category
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id),
                },
            }
        }

        for id in closed {
            debug!(
                target: LOG_TARGET,
                "Removing closed {:?} subscription",
                category
            );
            self.unregister(id);
        }

        delivered
    }

    fn insert(&self, category: NotificationCategory, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .entry(category)
            .or_default()
            .push((id, listener));
        debug!(
            target: LOG_TARGET,
            "Registered listener {:?} for {:?} notifications",
            id,
            category
        );
        id
    }
}
