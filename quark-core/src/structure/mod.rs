//! Structures of Atoms
//!
//! A structure arranges atoms into a tree so they can be read and written as
//! one plain value. Branches are lists or string-keyed maps, leaves are
//! atoms. The shape is fixed once built: nothing replaces a leaf with a
//! branch or the other way round.
//!
//! # Example
//!
//! ```rust
//! use quark_core::reactive::Atom;
//! use quark_core::structure::Structure;
//! use serde_json::json;
//!
//! let name = Atom::new(String::from("A"));
//! let first = Atom::new(1);
//! let second = Atom::new(2);
//!
//! let state = Structure::map([
//!     ("n", Structure::leaf(&name)),
//!     ("list", Structure::list([Structure::leaf(&first), Structure::leaf(&second)])),
//! ]);
//!
//! assert_eq!(state.snapshot().unwrap(), json!({"n": "A", "list": [1, 2]}));
//!
//! state.assign(&json!({"n": "B"})).unwrap();
//! assert_eq!(state.snapshot().unwrap(), json!({"n": "B", "list": [1, 2]}));
//! ```
//!
//! # Modules
//!
//! - `leaf`: type-erased atoms
//! - `walker`: the recursive traversals (assign, collect, snapshot)
//! - `view`: a memoized, subscribable snapshot of a whole structure

mod leaf;
pub mod walker;
mod view;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StructureError;
use crate::reactive::{Atom, ListenerSets};

pub use leaf::{Leaf, SnapshotKind, StagedWrite};
pub use view::{StructureView, ViewState};

/// A tree of atoms.
#[derive(Clone)]
pub enum Structure {
    /// An atom.
    Leaf(Arc<dyn Leaf>),
    /// An ordered sequence of structures.
    List(Vec<Structure>),
    /// A mapping from names to structures, in insertion order.
    Map(IndexMap<String, Structure>),
}

impl Structure {
    /// A leaf holding (a handle to) `atom`.
    pub fn leaf<T>(atom: &Atom<T>) -> Self
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        Structure::Leaf(Arc::new(atom.clone()))
    }

    /// A list branch.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Structure>,
    {
        Structure::List(items.into_iter().collect())
    }

    /// A map branch. Later duplicates of a key replace earlier ones.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Structure)>,
    {
        Structure::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Whether this is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Structure::Leaf(_))
    }

    /// Short name of this node's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Structure::Leaf(_) => "atom",
            Structure::List(_) => "list",
            Structure::Map(_) => "map",
        }
    }

    /// Number of children of a branch; zero for a leaf.
    pub fn len(&self) -> usize {
        match self {
            Structure::Leaf(_) => 0,
            Structure::List(items) => items.len(),
            Structure::Map(entries) => entries.len(),
        }
    }

    /// Whether this is a branch without children, or a leaf.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The child under `key` of a map branch.
    pub fn get(&self, key: &str) -> Option<&Structure> {
        match self {
            Structure::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// The child at `index` of a list branch.
    pub fn index(&self, index: usize) -> Option<&Structure> {
        match self {
            Structure::List(items) => items.get(index),
            _ => None,
        }
    }

    /// Number of leaf positions. An atom used at two positions counts twice.
    pub fn atom_count(&self) -> usize {
        match self {
            Structure::Leaf(_) => 1,
            Structure::List(items) => items.iter().map(Structure::atom_count).sum(),
            Structure::Map(entries) => entries.values().map(Structure::atom_count).sum(),
        }
    }

    /// Apply a (possibly partial) plain-value patch. See [`walker::assign`].
    pub fn assign(&self, values: &Value) -> Result<usize, StructureError> {
        walker::assign(self, values)
    }

    /// A fresh snapshot of the current values.
    pub fn snapshot(&self) -> Result<Value, StructureError> {
        walker::snapshot(self, SnapshotKind::Current)
    }

    /// A fresh snapshot of every atom's initial value.
    pub fn initial_snapshot(&self) -> Result<Value, StructureError> {
        walker::snapshot(self, SnapshotKind::Initial)
    }

    /// The distinct listener sets of the atoms in this structure.
    pub fn listener_sets(&self) -> ListenerSets {
        walker::collect_listener_sets(self)
    }

    /// A memoized, subscribable view over this structure.
    pub fn view(&self) -> StructureView {
        StructureView::new(self.clone())
    }
}

impl<T> From<&Atom<T>> for Structure
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn from(atom: &Atom<T>) -> Self {
        Structure::leaf(atom)
    }
}

impl<T> From<Atom<T>> for Structure
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn from(atom: Atom<T>) -> Self {
        Structure::Leaf(Arc::new(atom))
    }
}

impl fmt::Debug for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Structure::Leaf(leaf) => write!(f, "Leaf({})", leaf.atom_id()),
            Structure::List(items) => f.debug_list().entries(items).finish(),
            Structure::Map(entries) => f.debug_map().entries(entries).finish(),
        }
    }
}
