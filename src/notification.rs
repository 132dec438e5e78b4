//! User-visible notifications.
//!
//! Failures at the network boundary end up here instead of propagating. The
//! host drains the queue and decides how to show it.

use std::collections::VecDeque;
use std::time::Duration;

use web_time::Instant;

use crate::constants::NOTIFICATION_TTL_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: Instant,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Instant::now(),
        }
    }

    /// Whether the notification is older than `ttl` at `now`.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }
}

/// Pending notifications, oldest first.
#[derive(Debug, Clone)]
pub struct Notifications {
    queue: VecDeque<Notification>,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(Duration::from_secs(NOTIFICATION_TTL_SECS))
    }
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Queue a notification, logging it at the matching level.
    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>) {
        let notification = Notification::new(level, message);
        match level {
            NotificationLevel::Info => log::info!("{}", notification.message),
            NotificationLevel::Warning => log::warn!("{}", notification.message),
            NotificationLevel::Error => log::error!("{}", notification.message),
        }
        self.queue.push_back(notification);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Error, message);
    }

    /// Take every pending notification.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }

    /// Drop notifications older than the TTL.
    pub fn prune_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.queue.retain(|n| !n.is_expired(now, ttl));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether any pending notification has the given level.
    pub fn has_level(&self, level: NotificationLevel) -> bool {
        self.queue.iter().any(|n| n.level == level)
    }
}
