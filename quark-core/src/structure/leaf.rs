//! Structure Leaves
//!
//! A structure mixes atoms of different value types, so its leaves are
//! type-erased. The [`Leaf`] trait is the view of an atom the walker needs:
//! its identity, its listener set, and conversions between its typed value
//! and a plain `serde_json::Value`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reactive::{Atom, AtomId, ListenerSet};

/// Which value of an atom a snapshot reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// The live value.
    Current,
    /// The value the atom was created with.
    Initial,
}

/// A decoded write, ready to be applied. Returns whether the atom changed.
pub type StagedWrite = Box<dyn FnOnce() -> bool + Send>;

/// A type-erased atom usable as a structure leaf.
pub trait Leaf: Send + Sync {
    /// ID of the underlying atom.
    fn atom_id(&self) -> AtomId;

    /// The underlying atom's listener set.
    fn listeners(&self) -> &ListenerSet;

    /// Encode the current or initial value.
    fn to_value(&self, kind: SnapshotKind) -> Result<Value, serde_json::Error>;

    /// Decode `value` into the atom's type without writing it yet.
    fn stage(&self, value: &Value) -> Result<StagedWrite, serde_json::Error>;
}

impl<T> Leaf for Atom<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn atom_id(&self) -> AtomId {
        self.id()
    }

    fn listeners(&self) -> &ListenerSet {
        Atom::listeners(self)
    }

    fn to_value(&self, kind: SnapshotKind) -> Result<Value, serde_json::Error> {
        match kind {
            SnapshotKind::Current => self.with(|value| serde_json::to_value(value)),
            SnapshotKind::Initial => self.with_initial(|value| serde_json::to_value(value)),
        }
    }

    fn stage(&self, value: &Value) -> Result<StagedWrite, serde_json::Error> {
        let decoded = T::deserialize(value)?;
        let atom = self.clone();
        Ok(Box::new(move || atom.set(decoded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_encodes_current_and_initial() {
        let atom = Atom::new(vec![1, 2]);
        atom.mutate(|v| v.push(3));

        assert_eq!(atom.to_value(SnapshotKind::Current).unwrap(), json!([1, 2, 3]));
        assert_eq!(atom.to_value(SnapshotKind::Initial).unwrap(), json!([1, 2]));
    }

    #[test]
    fn staged_write_applies_only_when_run() {
        let atom = Atom::new(String::from("a"));
        let write = atom.stage(&json!("b")).unwrap();
        assert_eq!(atom.get(), "a");

        assert!(write());
        assert_eq!(atom.get(), "b");
    }

    #[test]
    fn stage_rejects_wrong_type() {
        let atom = Atom::new(1u32);
        assert!(atom.stage(&json!("one")).is_err());
        assert!(atom.stage(&json!(-1)).is_err());
        assert_eq!(atom.get(), 1);
    }
}
