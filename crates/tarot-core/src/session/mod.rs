//! Session monitor: the ordered stream of identity transitions.
//!
//! The publisher side is held by whatever resolves authentication (the account
//! service); the single consumer is the sync engine. Every actual transition is
//! delivered exactly once and in order, starting with the initial resolution.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::models::Identity;

/// Publishing half of the session channel
#[derive(Clone)]
pub struct SessionMonitor {
    sender: mpsc::UnboundedSender<Identity>,
    current: Arc<Mutex<Option<Identity>>>,
}

/// Receiving half, consumed by the sync engine
pub struct IdentityEvents {
    receiver: mpsc::UnboundedReceiver<Identity>,
}

impl SessionMonitor {
    /// Create a connected publisher and event stream
    #[must_use]
    pub fn channel() -> (Self, IdentityEvents) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                current: Arc::new(Mutex::new(None)),
            },
            IdentityEvents { receiver },
        )
    }

    /// Publish an identity. Repeats of the last published value are dropped.
    ///
    /// Returns whether the value was forwarded.
    pub fn publish(&self, identity: Identity) -> bool {
        let Ok(mut current) = self.current.lock() else {
            return false;
        };
        if current.as_ref() == Some(&identity) {
            return false;
        }

        tracing::debug!("Identity changed to {}", identity);
        *current = Some(identity.clone());
        if self.sender.send(identity).is_err() {
            tracing::debug!("Identity stream closed; transition not delivered");
        }
        true
    }

    /// Last published identity; `None` before the initial resolution
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.current.lock().ok().and_then(|current| current.clone())
    }
}

impl IdentityEvents {
    /// Next transition; `None` once every publisher is gone
    pub async fn next(&mut self) -> Option<Identity> {
        self.receiver.recv().await
    }

    /// Next transition if one is already queued
    pub fn try_next(&mut self) -> Option<Identity> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn delivers_initial_resolution_and_transitions_in_order() {
        let (monitor, mut events) = SessionMonitor::channel();
        assert_eq!(monitor.current(), None);

        assert!(monitor.publish(Identity::SignedOut));
        assert!(monitor.publish(Identity::signed_in("a")));
        assert!(monitor.publish(Identity::signed_in("b")));
        assert!(monitor.publish(Identity::SignedOut));

        assert_eq!(events.next().await, Some(Identity::SignedOut));
        assert_eq!(events.next().await, Some(Identity::signed_in("a")));
        assert_eq!(events.next().await, Some(Identity::signed_in("b")));
        assert_eq!(events.next().await, Some(Identity::SignedOut));
        assert_eq!(monitor.current(), Some(Identity::SignedOut));
    }

    #[tokio::test]
    async fn duplicate_identity_is_not_redelivered() {
        let (monitor, mut events) = SessionMonitor::channel();
        monitor.publish(Identity::signed_in("a"));
        assert!(!monitor.publish(Identity::signed_in("a")));

        assert_eq!(events.try_next(), Some(Identity::signed_in("a")));
        assert_eq!(events.try_next(), None);
    }

    #[tokio::test]
    async fn stream_ends_when_publishers_drop() {
        let (monitor, mut events) = SessionMonitor::channel();
        let clone = monitor.clone();
        drop(monitor);
        clone.publish(Identity::SignedOut);
        drop(clone);

        assert_eq!(events.next().await, Some(Identity::SignedOut));
        assert_eq!(events.next().await, None);
    }
}
