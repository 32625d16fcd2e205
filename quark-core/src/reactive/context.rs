//! Reactive Context
//!
//! The reactive context tracks which observer is currently running. This is
//! what makes `Atom::use_value` reactive: when an atom is read that way, the
//! running observer is attached to the atom's listener set right away, and
//! the set is recorded so the observer can drop dependencies it stops
//! reading.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running an observer pushes an entry; the
//! guard pops it when dropped, even if the run panics. Nested observers
//! (an observer created while another one runs) each see their own entry.

use std::cell::RefCell;

use super::listeners::{ListenerSet, ListenerSets};
use super::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = RefCell::new(Vec::new());
}

#[derive(Debug)]
struct ContextEntry {
    /// The running observer's subscriber.
    subscriber: Subscriber,
    /// Listener sets of the atoms read with `use_value` during this run.
    dependencies: ListenerSets,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: SubscriberId,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, atoms read with `use_value` attach
    /// `subscriber` to their listener sets. The context is exited when the
    /// returned guard is dropped.
    pub fn enter(subscriber: Subscriber) -> Self {
        let subscriber_id = subscriber.id();
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber,
                dependencies: ListenerSets::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.subscriber.id()))
    }

    /// Record a read of the atom owning `listeners` and attach the running
    /// subscriber to it.
    ///
    /// Does nothing outside a reactive context.
    pub fn track(listeners: &ListenerSet) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if entry.dependencies.insert(listeners.clone()) {
                    listeners.insert(entry.subscriber.clone());
                }
            }
        });
    }

    /// Take the dependencies collected so far in the current context.
    pub fn take_dependencies() -> ListenerSets {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .map(|entry| std::mem::take(&mut entry.dependencies))
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber.id(),
                    self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id,
                    entry.subscriber.id()
                );
            }
        });
    }
}
