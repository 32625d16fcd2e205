//! Quark Core
//!
//! This crate provides the core runtime for Quark, a minimal reactive state
//! container. It implements:
//!
//! - Atoms: mutable cells that notify listeners when they change
//! - Structures: trees of atoms read and written as one plain value
//! - Structure views: memoized snapshots of a structure that re-notify
//!   whenever one of its atoms changes
//! - The external-store contract hosts (rendering frameworks, bindings)
//!   use to subscribe
//!
//! Rendering, persistence and input handling live outside this crate.
//!
//! # Architecture
//!
//! - `reactive`: atoms, listener sets, subscriptions, observers
//! - `structure`: structure trees, the walker, structure views
//! - `error`: errors raised at the typed/plain value boundary
//!
//! With the `python` feature the crate also builds the `_core` Python
//! extension module.
//!
//! # Example
//!
//! ```rust
//! use quark_core::reactive::Atom;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let x = Atom::new(10);
//! let calls = Arc::new(AtomicUsize::new(0));
//!
//! let calls_clone = calls.clone();
//! let _sub = x.subscribe_fn(move || {
//!     calls_clone.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! x.set(20);
//! x.set(20); // same value, listener not called
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```

pub mod error;
pub mod reactive;
pub mod structure;

#[cfg(feature = "python")]
mod python;

pub use error::{Path, PathSegment, StructureError};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyAtom>()?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
