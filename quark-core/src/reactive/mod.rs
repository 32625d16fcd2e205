//! Reactive Primitives
//!
//! This module implements the core reactive system: atoms, the listener sets
//! they notify, and the contract hosts use to subscribe to them.
//!
//! # Concepts
//!
//! ## Atoms
//!
//! An Atom is a container for mutable state. It owns its value, the value
//! it was created with, and a set of listeners. Writing a different value
//! with `set`, or editing it in place with `mutate`, synchronously calls
//! every listener.
//!
//! ## External stores
//!
//! Hosts (rendering frameworks, bindings) consume state through the
//! [`ExternalStore`] trait: `subscribe`, `snapshot`, `initial_snapshot`.
//! Atoms and structure views both implement it.
//!
//! ## Observers
//!
//! An Observer is a computation that re-runs when the atoms it reads with
//! `use_value` change. It is the reference host for the reactive read.
//!
//! # Implementation Notes
//!
//! There is no global registry: each atom owns its listener set, and every
//! subscription is a guard that knows how to detach itself. Observers find
//! out what they read through a thread-local tracking context.

mod atom;
mod context;
pub mod equality;
pub(crate) mod listeners;
mod observer;
mod store;
mod subscriber;

pub use atom::{Atom, AtomId};
pub use context::ReactiveContext;
pub use equality::EqualityFn;
pub use listeners::{ListenerSet, ListenerSets};
pub use observer::{Observer, MAX_RERUNS};
pub use store::{ExternalStore, Subscription};
pub use subscriber::{Subscriber, SubscriberId};
