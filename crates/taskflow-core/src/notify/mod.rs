//! Single-slot transient notifications with self-canceling expiry.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::DEFAULT_NOTIFICATION_TTL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub outcome: Outcome,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<Notification>,
    /// The only timer allowed to clear `current`.
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl Slot {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Holds at most one visible notification.
///
/// Clones share the same slot. The expiry task only holds a weak reference,
/// so dropping the last scheduler also cancels a pending timer.
#[derive(Debug, Clone)]
pub struct NotificationScheduler {
    slot: Arc<Mutex<Slot>>,
    ttl: Duration,
}

impl Default for NotificationScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

impl NotificationScheduler {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            ttl,
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replace whatever is showing and restart the expiry countdown.
    pub fn show(&self, text: impl Into<String>, outcome: Outcome) {
        let text = text.into();
        let mut slot = self.slot.lock();
        slot.cancel_timer();
        slot.generation = slot.generation.wrapping_add(1);

        let expires_at = Instant::now() + self.ttl;
        tracing::debug!("Showing {:?} notification: {}", outcome, text);
        slot.current = Some(Notification {
            text,
            outcome,
            expires_at,
        });
        slot.timer = spawn_expiry(Arc::downgrade(&self.slot), slot.generation, expires_at);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.show(text, Outcome::Success);
    }

    pub fn failure(&self, text: impl Into<String>) {
        self.show(text, Outcome::Failure);
    }

    /// Dismiss immediately and cancel the pending timer.
    pub fn clear(&self) {
        let mut slot = self.slot.lock();
        slot.cancel_timer();
        slot.generation = slot.generation.wrapping_add(1);
        slot.current = None;
    }

    pub fn current(&self) -> Option<Notification> {
        self.slot.lock().current.clone()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.slot
            .lock()
            .timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

fn spawn_expiry(
    slot: Weak<Mutex<Slot>>,
    generation: u64,
    expires_at: Instant,
) -> Option<JoinHandle<()>> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::debug!("No async runtime; notification will stay until replaced");
        return None;
    };

    Some(runtime.spawn(async move {
        tokio::time::sleep_until(expires_at).await;
        let Some(slot) = slot.upgrade() else {
            return;
        };
        let mut slot = slot.lock();
        if slot.generation == generation {
            slot.current = None;
            slot.timer = None;
        }
    }))
}
