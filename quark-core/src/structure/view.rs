//! Structure View
//!
//! A StructureView presents a whole structure of atoms as one subscribable
//! value: its snapshot.
//!
//! # How Views Work
//!
//! 1. The first read computes the current snapshot and caches it. Later
//!    reads return the same `Arc` until an atom in the structure notifies.
//!
//! 2. Hosts subscribe to the view's own listener set. While that set is
//!    non-empty, the view keeps one derived callback attached to the
//!    listener sets of every atom in the structure. When any of those atoms
//!    notifies, the callback recomputes the snapshot once and then notifies
//!    every host. Because the atom sets are deduplicated, an atom that sits
//!    at several positions still triggers one notification per change, and
//!    every host sees the same `Arc` until the next change.
//!
//! 3. The initial snapshot (every atom's creation value) is computed on first
//!    read and never again.
//!
//! Observers read a view reactively with [`StructureView::use_snapshot`],
//! which tracks the view's host set the way `Atom::use_value` tracks an
//! atom's listener set.
//!
//! # Staleness
//!
//! Nothing refreshes the cache while the derived callback is detached. When
//! it is attached again, the cached snapshot is compared against a fresh one
//! and replaced if the structure changed in the meantime; if it did not, the
//! cached `Arc` is kept so readers see a stable reference.
//!
//! The derived callback is detached as soon as the last [`Subscription`]
//! goes away. Observers leave the host set without telling the view, so
//! after the last observer stops reading it the callback is detached on the
//! next atom notification instead.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use super::leaf::SnapshotKind;
use super::walker;
use super::Structure;
use crate::error::StructureError;
use crate::reactive::{
    AtomId, ExternalStore, ListenerSet, ListenerSets, ReactiveContext, Subscriber, SubscriberId,
    Subscription,
};

/// Whether a view currently has subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// No subscriber is attached; the cache is not kept up to date.
    Unsubscribed,
    /// At least one subscriber is attached.
    Subscribed,
}

/// The derived callback and the atom sets it is attached to.
struct Wiring {
    sets: ListenerSets,
    derived: SubscriberId,
}

struct ViewShared {
    structure: Structure,

    /// Cached current snapshot (None until first read or after a failed
    /// recomputation).
    current: Mutex<Option<Arc<Value>>>,

    /// Cached initial snapshot. Once set, never replaced.
    initial: Mutex<Option<Arc<Value>>>,

    /// Host subscribers and observers, notified after each recomputation.
    hosts: ListenerSet,

    /// Present while the view listens to its atoms.
    wiring: Mutex<Option<Wiring>>,
}

impl ViewShared {
    fn current_snapshot(&self) -> Result<Arc<Value>, StructureError> {
        let mut cache = self.current.lock();
        if let Some(cached) = cache.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let fresh = Arc::new(walker::snapshot(&self.structure, SnapshotKind::Current)?);
        *cache = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    fn initial_snapshot(&self) -> Result<Arc<Value>, StructureError> {
        let mut cache = self.initial.lock();
        if let Some(cached) = cache.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let fresh = Arc::new(walker::snapshot(&self.structure, SnapshotKind::Initial)?);
        *cache = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Replace the cached snapshot after an atom notified.
    fn recompute(&self) {
        let fresh = walker::snapshot(&self.structure, SnapshotKind::Current);
        let mut cache = self.current.lock();
        match fresh {
            Ok(value) => {
                tracing::trace!("structure view recomputed");
                *cache = Some(Arc::new(value));
            }
            Err(error) => {
                tracing::warn!(%error, "structure view recomputation failed");
                *cache = None;
            }
        }
    }

    /// Bring an existing cache up to date, keeping its `Arc` if unchanged.
    fn revalidate(&self) {
        let mut cache = self.current.lock();
        let Some(cached) = cache.clone() else {
            return;
        };

        match walker::snapshot(&self.structure, SnapshotKind::Current) {
            Ok(fresh) if fresh == *cached => {}
            Ok(fresh) => *cache = Some(Arc::new(fresh)),
            Err(_) => *cache = None,
        }
    }

    /// Attach the derived callback to every atom, unless already attached.
    fn attach(self: &Arc<Self>) {
        let mut wiring = self.wiring.lock();
        if wiring.is_some() {
            return;
        }

        self.revalidate();

        let sets = walker::collect_listener_sets(&self.structure);
        let weak: Weak<ViewShared> = Arc::downgrade(self);
        let derived = Subscriber::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_atom_change();
            }
        });
        sets.attach(&derived);

        tracing::debug!(atoms = sets.len(), "structure view attached");
        *wiring = Some(Wiring {
            sets,
            derived: derived.id(),
        });
    }

    /// Detach the derived callback if no host is left.
    fn detach_if_idle(&self) {
        let mut wiring = self.wiring.lock();
        if !self.hosts.is_empty() {
            return;
        }

        if let Some(Wiring { sets, derived }) = wiring.take() {
            sets.detach(derived);
            tracing::debug!(atoms = sets.len(), "structure view detached");
        }
    }

    fn on_atom_change(&self) {
        if self.hosts.is_empty() {
            self.detach_if_idle();
            return;
        }

        self.recompute();
        self.hosts.notify();
    }
}

impl Drop for ViewShared {
    fn drop(&mut self) {
        if let Some(Wiring { sets, derived }) = self.wiring.get_mut().take() {
            sets.detach(derived);
        }
    }
}

/// A memoized, subscribable snapshot of a structure.
///
/// Clones share the same caches and subscribers.
///
/// # Example
///
/// ```rust
/// use quark_core::reactive::Atom;
/// use quark_core::structure::Structure;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let count = Atom::new(1);
/// let view = Structure::map([("count", Structure::leaf(&count))]).view();
///
/// let first = view.snapshot().unwrap();
/// assert!(Arc::ptr_eq(&first, &view.snapshot().unwrap()));
///
/// let _sub = view.subscribe_fn(|| {});
/// count.set(2);
///
/// assert_eq!(*view.snapshot().unwrap(), json!({"count": 2}));
/// assert_eq!(*view.initial_snapshot().unwrap(), json!({"count": 1}));
/// ```
#[derive(Clone)]
pub struct StructureView {
    shared: Arc<ViewShared>,
}

impl StructureView {
    /// Create a view over `structure`. Nothing is computed yet.
    pub fn new(structure: Structure) -> Self {
        Self {
            shared: Arc::new(ViewShared {
                structure,
                current: Mutex::new(None),
                initial: Mutex::new(None),
                hosts: ListenerSet::new(AtomId::next()),
                wiring: Mutex::new(None),
            }),
        }
    }

    /// The structure this view covers.
    pub fn structure(&self) -> &Structure {
        &self.shared.structure
    }

    /// The current snapshot, computed on first read and after changes.
    pub fn snapshot(&self) -> Result<Arc<Value>, StructureError> {
        self.shared.current_snapshot()
    }

    /// The snapshot of every atom's initial value, computed once.
    pub fn initial_snapshot(&self) -> Result<Arc<Value>, StructureError> {
        self.shared.initial_snapshot()
    }

    /// Read the current snapshot and track the view as a dependency.
    ///
    /// Inside an [`Observer`](crate::reactive::Observer) run, the observer
    /// re-runs after every change to any atom in the structure. Outside a
    /// reactive context this is the same as [`StructureView::snapshot`].
    pub fn use_snapshot(&self) -> Result<Arc<Value>, StructureError> {
        if ReactiveContext::is_active() {
            ReactiveContext::track(&self.shared.hosts);
            self.shared.attach();
        }
        self.snapshot()
    }

    /// Whether the view has subscribers.
    pub fn state(&self) -> ViewState {
        if self.subscriber_count() == 0 {
            ViewState::Unsubscribed
        } else {
            ViewState::Subscribed
        }
    }

    /// Number of hosts and observers currently subscribed.
    pub fn subscriber_count(&self) -> usize {
        self.shared.hosts.len()
    }

    /// Whether the derived callback is attached to the atoms.
    pub fn is_attached(&self) -> bool {
        self.shared.wiring.lock().is_some()
    }

    /// Whether a current snapshot is cached.
    pub fn is_cached(&self) -> bool {
        self.shared.current.lock().is_some()
    }

    /// Subscribe a plain closure.
    pub fn subscribe_fn<F>(&self, on_change: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(Subscriber::new(on_change))
    }
}

impl ExternalStore for StructureView {
    type Snapshot = Result<Arc<Value>, StructureError>;

    fn subscribe(&self, subscriber: Subscriber) -> Subscription {
        let id = subscriber.id();
        if !self.shared.hosts.insert(subscriber) {
            return Subscription::inert(id);
        }
        self.shared.attach();

        let shared = Arc::clone(&self.shared);
        Subscription::new(id, move || {
            shared.hosts.remove(id);
            shared.detach_if_idle();
        })
    }

    fn snapshot(&self) -> Self::Snapshot {
        StructureView::snapshot(self)
    }

    fn initial_snapshot(&self) -> Self::Snapshot {
        StructureView::initial_snapshot(self)
    }
}

impl std::fmt::Debug for StructureView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructureView")
            .field("structure", &self.shared.structure)
            .field("state", &self.state())
            .field("attached", &self.is_attached())
            .field("cached", &self.is_cached())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
