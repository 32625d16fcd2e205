//! Observer Implementation
//!
//! An Observer is the host side of `Atom::use_value`: a computation (usually
//! a render function) that re-runs whenever an atom it read changes.
//!
//! # How Observers Work
//!
//! 1. When created, the observer runs its function immediately inside a
//!    reactive context. Every `use_value` call during the run subscribes the
//!    observer to that atom.
//!
//! 2. After the run, the observer unsubscribes from atoms it read last time
//!    but not this time.
//!
//! 3. When any of those atoms notifies, the observer re-runs synchronously,
//!    picking up its dependencies afresh.
//!
//! A notification that arrives while the observer is already running (the
//! run wrote to one of its own dependencies) is not lost: the observer runs
//! again right after the current run, up to [`MAX_RERUNS`] times in a row.
//!
//! # Cleanup
//!
//! `dispose` detaches the observer from every atom. Dropping the last handle
//! does the same.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::listeners::ListenerSets;
use super::subscriber::{Subscriber, SubscriberId};

/// Consecutive re-runs allowed for an observer that keeps invalidating
/// itself before it is stopped.
pub const MAX_RERUNS: usize = 100;

struct ObserverInner {
    /// The subscriber attached to every dependency.
    subscriber: Subscriber,

    /// The observed computation.
    run: Box<dyn Fn() + Send + Sync>,

    /// Listener sets of the atoms read during the last run.
    dependencies: Mutex<ListenerSets>,

    disposed: AtomicBool,

    /// Set while `run` executes.
    running: AtomicBool,

    /// Set when a notification arrives during a run.
    pending: AtomicBool,

    /// Number of times the observer has run.
    run_count: AtomicUsize,
}

impl ObserverInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        if self.running.swap(true, Ordering::SeqCst) {
            self.pending.store(true, Ordering::SeqCst);
            return;
        }
        let _running = RunningGuard(&self.running);

        let mut reruns = 0;
        loop {
            self.pending.store(false, Ordering::SeqCst);

            let tracked = {
                let _ctx = ReactiveContext::enter(self.subscriber.clone());
                (self.run)();
                ReactiveContext::take_dependencies()
            };
            self.rewire(tracked);
            self.run_count.fetch_add(1, Ordering::SeqCst);

            if !self.pending.load(Ordering::SeqCst) || self.disposed.load(Ordering::SeqCst) {
                break;
            }

            reruns += 1;
            if reruns >= MAX_RERUNS {
                tracing::warn!(
                    subscriber = %self.subscriber.id(),
                    reruns,
                    "observer keeps invalidating itself; giving up"
                );
                break;
            }
        }
    }

    /// Replace the previous dependencies with `tracked`.
    fn rewire(&self, tracked: ListenerSets) {
        let id = self.subscriber.id();
        if self.disposed.load(Ordering::SeqCst) {
            tracked.detach(id);
            return;
        }

        let mut dependencies = self.dependencies.lock();

        for set in dependencies.iter() {
            if !tracked.contains(set.owner()) {
                set.remove(id);
            }
        }
        tracked.attach(&self.subscriber);

        tracing::trace!(subscriber = %id, dependencies = tracked.len(), "observer rewired");
        *dependencies = tracked;
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let dependencies = std::mem::take(&mut *self.dependencies.lock());
        dependencies.detach(self.subscriber.id());
        tracing::debug!(subscriber = %self.subscriber.id(), "observer disposed");
    }
}

impl Drop for ObserverInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A computation that re-runs when the atoms it reads change.
///
/// # Example
///
/// ```rust
/// use quark_core::reactive::{Atom, Observer};
/// use std::sync::{Arc, Mutex};
///
/// let name = Atom::new(String::from("Ada"));
/// let rendered = Arc::new(Mutex::new(Vec::new()));
///
/// let observer = Observer::new({
///     let name = name.clone();
///     let rendered = rendered.clone();
///     move || rendered.lock().unwrap().push(format!("Hello, {}", name.use_value()))
/// });
///
/// name.set("Grace".into());
/// assert_eq!(*rendered.lock().unwrap(), ["Hello, Ada", "Hello, Grace"]);
///
/// observer.dispose();
/// name.set("Edsger".into());
/// assert_eq!(rendered.lock().unwrap().len(), 2);
/// ```
#[derive(Clone)]
pub struct Observer {
    inner: Arc<ObserverInner>,
}

impl Observer {
    /// Create a new observer and run it once.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let observer = Self::new_lazy(run);
        observer.execute();
        observer
    }

    /// Create a new observer without running it.
    ///
    /// It has no dependencies until [`Observer::execute`] is called.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak: &Weak<ObserverInner>| {
            let weak = weak.clone();
            ObserverInner {
                subscriber: Subscriber::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.execute();
                    }
                }),
                run: Box::new(run),
                dependencies: Mutex::new(ListenerSets::new()),
                disposed: AtomicBool::new(false),
                running: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }
        });

        Self { inner }
    }

    /// The subscriber ID attached to every dependency.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber.id()
    }

    /// Run the computation now and refresh the dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Stop observing. After disposal the observer never runs again.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the observer has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the observer has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of atoms the observer currently depends on.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.lock().len()
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("subscriber_id", &self.subscriber_id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
