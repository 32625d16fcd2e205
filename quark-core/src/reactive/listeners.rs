//! Listener Sets
//!
//! Every atom owns exactly one listener set. Structure views attach their
//! derived callback straight onto the sets of the atoms they cover, so a
//! `ListenerSet` is a shared handle: clones refer to the same set.
//!
//! # Notification
//!
//! A notification pass copies the current listeners, releases the lock, and
//! then invokes them in insertion order. Listeners are therefore free to
//! re-enter: write to atoms, subscribe, or unsubscribe. Before each call the
//! listener's membership is re-checked, so a listener removed earlier in the
//! same pass is skipped. Listeners added during a pass are first called on
//! the next pass.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::atom::AtomId;
use super::subscriber::{Subscriber, SubscriberId};

/// The set of change listeners attached to one atom.
#[derive(Clone)]
pub struct ListenerSet {
    /// The atom this set belongs to.
    owner: AtomId,

    /// Listeners keyed by subscriber ID, in insertion order.
    listeners: Arc<Mutex<IndexMap<SubscriberId, Subscriber>>>,
}

impl ListenerSet {
    pub(crate) fn new(owner: AtomId) -> Self {
        Self {
            owner,
            listeners: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    /// The atom that owns this set.
    pub fn owner(&self) -> AtomId {
        self.owner
    }

    /// Add a listener. Returns `false` if its ID was already present, in
    /// which case the set is unchanged.
    pub fn insert(&self, subscriber: Subscriber) -> bool {
        match self.listeners.lock().entry(subscriber.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(subscriber);
                true
            }
        }
    }

    /// Remove a listener. Returns `false` if it was not present.
    pub fn remove(&self, id: SubscriberId) -> bool {
        self.listeners.lock().shift_remove(&id).is_some()
    }

    /// Whether a listener with this ID is attached.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.listeners.lock().contains_key(&id)
    }

    /// Number of attached listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether no listener is attached.
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Whether both handles refer to the same underlying set.
    pub fn same_set(&self, other: &ListenerSet) -> bool {
        Arc::ptr_eq(&self.listeners, &other.listeners)
    }

    /// Invoke every listener once, in insertion order.
    pub fn notify(&self) {
        let pending: SmallVec<[Subscriber; 4]> =
            self.listeners.lock().values().cloned().collect();

        tracing::trace!(atom = %self.owner, listeners = pending.len(), "notify");

        let delivered: Result<(), Infallible> = deliver(
            pending,
            |subscriber| self.contains(subscriber.id()),
            |subscriber| {
                subscriber.notify();
                Ok(())
            },
        );
        if let Err(never) = delivered {
            match never {}
        }
    }
}

/// Run one notification pass over a copy of the listeners.
///
/// Listeners for which `subscribed` is false at their turn are skipped. A
/// failing listener does not end the pass: every remaining listener still
/// runs, and the first failure is returned afterwards.
pub(crate) fn deliver<L, E>(
    pending: impl IntoIterator<Item = L>,
    mut subscribed: impl FnMut(&L) -> bool,
    mut call: impl FnMut(L) -> Result<(), E>,
) -> Result<(), E> {
    let mut first_error = None;
    for listener in pending {
        if !subscribed(&listener) {
            continue;
        }
        if let Err(error) = call(listener) {
            first_error.get_or_insert(error);
        }
    }
    first_error.map_or(Ok(()), Err)
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("owner", &self.owner)
            .field("len", &self.len())
            .finish()
    }
}

/// An accumulator of listener sets, deduplicated by owning atom.
///
/// Used by structure views to remember every set their derived callback is
/// attached to, and by observers to remember their dependencies.
#[derive(Debug, Clone, Default)]
pub struct ListenerSets {
    sets: IndexMap<AtomId, ListenerSet>,
}

impl ListenerSets {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a set. Returns `false` if a set for the same atom is already held.
    pub fn insert(&mut self, set: ListenerSet) -> bool {
        match self.sets.entry(set.owner()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(set);
                true
            }
        }
    }

    /// Whether the set of the given atom is held.
    pub fn contains(&self, atom: AtomId) -> bool {
        self.sets.contains_key(&atom)
    }

    /// Number of distinct sets held.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no set is held.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Iterate over the held sets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ListenerSet> {
        self.sets.values()
    }

    /// Attach `subscriber` to every held set.
    pub fn attach(&self, subscriber: &Subscriber) {
        for set in self.sets.values() {
            set.insert(subscriber.clone());
        }
    }

    /// Detach the subscriber with `id` from every held set.
    pub fn detach(&self, id: SubscriberId) {
        for set in self.sets.values() {
            set.remove(id);
        }
    }
}
