//! External Store Contract
//!
//! Host frameworks integrate with Quark through three callbacks: subscribe
//! to changes, read the current snapshot, and read the initial snapshot that
//! is safe to use before the host's reactive runtime has attached (for
//! example while producing server-rendered output). Atoms and structure
//! views both implement this contract; a host adapter maps it onto its own
//! scheduling primitives.

use std::fmt;

use super::subscriber::{Subscriber, SubscriberId};

/// Anything a host can subscribe to and read snapshots from.
pub trait ExternalStore {
    /// What `snapshot` and `initial_snapshot` return.
    type Snapshot;

    /// Register `subscriber` to be called after every change.
    ///
    /// The returned guard deregisters it when dropped or when
    /// [`Subscription::unsubscribe`] is called.
    fn subscribe(&self, subscriber: Subscriber) -> Subscription;

    /// The current value, consistent with the last delivered notification.
    fn snapshot(&self) -> Self::Snapshot;

    /// The value as it was before any change; computed once.
    fn initial_snapshot(&self) -> Self::Snapshot;
}

/// Handle to a registered subscriber.
///
/// Dropping this handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    subscriber_id: SubscriberId,
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(subscriber_id: SubscriberId, detach: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            subscriber_id,
            detach: Some(Box::new(detach)),
        }
    }

    /// A handle that registered nothing, returned when the subscriber was
    /// already attached. Dropping it leaves the existing registration alone.
    pub(crate) fn inert(subscriber_id: SubscriberId) -> Self {
        Self {
            subscriber_id,
            detach: None,
        }
    }

    /// ID of the subscriber this handle registered.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    /// Whether the subscriber is still registered through this handle.
    ///
    /// Subscribing a subscriber that is already attached yields a handle
    /// that is inactive from the start; only the first handle owns the
    /// registration.
    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    /// Deregister the subscriber now.
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber_id", &self.subscriber_id)
            .field("active", &self.is_active())
            .finish()
    }
}
