//! Atom Implementation
//!
//! An Atom is the only piece of mutable state in Quark. It holds a value,
//! the value it was created with, and the set of listeners to call when the
//! value changes.
//!
//! # How Atoms Notify
//!
//! 1. `set` compares the new value against the current one with the atom's
//!    equality function. Equal values are dropped without notifying.
//!
//! 2. `mutate` edits the value in place and always notifies, because an
//!    in-place edit cannot be compared against the previous value.
//!
//! 3. Notification is a synchronous fan-out: every listener runs, in the
//!    order it was added, before `set`/`mutate` returns.
//!
//! # Thread Safety
//!
//! The value is protected by a `RwLock` and the listener set by a `Mutex`.
//! Neither lock is held while listeners run, so a listener may write to any
//! atom (including this one) without deadlocking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::equality::{self, EqualityFn};
use super::listeners::ListenerSet;
use super::store::{ExternalStore, Subscription};
use super::subscriber::{Subscriber, SubscriberId};

/// Unique identifier for an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomId(u64);

impl AtomId {
    /// Generate a new unique atom ID.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

struct AtomInner<T> {
    id: AtomId,

    /// The current value.
    value: RwLock<T>,

    /// The value the atom was created with. Never changes.
    initial: T,

    /// Gate for `set`.
    equals: EqualityFn<T>,

    listeners: ListenerSet,
}

/// A reactive cell holding a value of type T.
///
/// Cloning an atom yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use quark_core::reactive::Atom;
///
/// let count = Atom::new(10);
/// assert_eq!(count.get(), 10);
///
/// assert!(count.set(20));
/// assert!(!count.set(20)); // same value, no notification
///
/// count.mutate(|v| *v += 1);
/// assert_eq!(count.get(), 21);
/// assert_eq!(count.initial(), 10);
/// ```
pub struct Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<AtomInner<T>>,
}

impl<T> Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new atom, gated by `PartialEq`.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_equality(value, equality::equals)
    }

    /// Create a new atom with a custom equality gate for `set`.
    pub fn with_equality(value: T, equals: EqualityFn<T>) -> Self {
        let id = AtomId::next();
        Self {
            inner: Arc::new(AtomInner {
                id,
                initial: value.clone(),
                value: RwLock::new(value),
                equals,
                listeners: ListenerSet::new(id),
            }),
        }
    }

    /// Get the atom's unique ID.
    pub fn id(&self) -> AtomId {
        self.inner.id
    }

    /// Get the current value without subscribing to it.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read the current value without cloning it.
    ///
    /// The value stays read-locked while `f` runs, so `f` must not write to
    /// this atom.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.read())
    }

    /// Get the value the atom was created with.
    pub fn initial(&self) -> T {
        self.inner.initial.clone()
    }

    /// Read the initial value without cloning it.
    pub fn with_initial<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.initial)
    }

    /// Get the current value and subscribe the running observer to it.
    ///
    /// Inside an [`Observer`](super::Observer) run, the observer is re-run
    /// whenever this atom changes, for as long as the observer lives. Outside
    /// any observer this is the same as [`Atom::get`].
    pub fn use_value(&self) -> T {
        ReactiveContext::track(&self.inner.listeners);
        self.get()
    }

    /// Replace the value and notify listeners.
    ///
    /// Returns `false` without notifying if the new value is equal to the
    /// current one under the atom's equality function.
    pub fn set(&self, value: T) -> bool {
        {
            let mut guard = self.inner.value.write();
            if (self.inner.equals)(&*guard, &value) {
                return false;
            }
            *guard = value;
        }

        self.inner.listeners.notify();
        true
    }

    /// Compute a new value from the current one and `set` it.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = self.with(f);
        self.set(new_value)
    }

    /// Edit the value in place, then notify every listener.
    ///
    /// Listeners are notified even if `f` changed nothing. If `f` panics the
    /// panic propagates, nobody is notified, and whatever `f` already wrote
    /// stays in place.
    pub fn mutate<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let result = {
            let mut guard = self.inner.value.write();
            f(&mut *guard)
        };

        self.inner.listeners.notify();
        result
    }

    /// Fallible [`Atom::mutate`].
    ///
    /// On `Err` the error is returned, nobody is notified, and any partial
    /// edit made before the error stays in place.
    pub fn try_mutate<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let result = {
            let mut guard = self.inner.value.write();
            f(&mut *guard)?
        };

        self.inner.listeners.notify();
        Ok(result)
    }

    /// Subscribe a plain closure.
    pub fn subscribe_fn<F>(&self, on_change: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(Subscriber::new(on_change))
    }

    /// Remove a listener by ID. Returns `false` if it was not attached.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// The atom's listener set.
    pub fn listeners(&self) -> &ListenerSet {
        &self.inner.listeners
    }

    /// Get the number of listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl<T> ExternalStore for Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Snapshot = T;

    fn subscribe(&self, subscriber: Subscriber) -> Subscription {
        let id = subscriber.id();
        if !self.inner.listeners.insert(subscriber) {
            return Subscription::inert(id);
        }

        let listeners = self.inner.listeners.clone();
        Subscription::new(id, move || {
            listeners.remove(id);
        })
    }

    fn snapshot(&self) -> T {
        self.get()
    }

    fn initial_snapshot(&self) -> T {
        self.initial()
    }
}

impl<T> Clone for Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Atom<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .field("initial", &self.inner.initial)
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
