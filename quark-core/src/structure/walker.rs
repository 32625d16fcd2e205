//! Structure Walker
//!
//! The three recursive traversals over a [`Structure`]. All of them are
//! synchronous, visit every node once, and use stack proportional to the
//! structure's depth.
//!
//! # Partial assignment
//!
//! Lists and maps follow the same patch policy: a patch may cover only part
//! of a branch, and whatever it leaves out is untouched. For maps that means
//! absent keys; for lists, missing trailing entries. What a patch may not do
//! is name slots that do not exist (unknown keys, or more entries than the
//! list has) or use the wrong kind of container.

use serde_json::{Map, Value};

use super::leaf::{SnapshotKind, StagedWrite};
use super::Structure;
use crate::error::{value_kind, Path, StructureError};
use crate::reactive::ListenerSets;

/// Apply a plain-value patch to the atoms of `structure`.
///
/// Every leaf value is decoded before any atom is written, so an invalid
/// patch changes nothing. Valid writes are then applied one by one, in patch
/// order, each notifying its atom's listeners as usual. Returns the number
/// of atoms whose value changed.
pub fn assign(structure: &Structure, values: &Value) -> Result<usize, StructureError> {
    let mut staged = Vec::new();
    stage_at(structure, values, &mut Path::root(), &mut staged)?;

    tracing::trace!(writes = staged.len(), "applying structure patch");
    let mut changed = 0;
    for write in staged {
        if write() {
            changed += 1;
        }
    }
    Ok(changed)
}

fn stage_at(
    structure: &Structure,
    values: &Value,
    path: &mut Path,
    staged: &mut Vec<StagedWrite>,
) -> Result<(), StructureError> {
    match structure {
        Structure::Leaf(leaf) => {
            let write = leaf.stage(values).map_err(|source| StructureError::Decode {
                path: path.clone(),
                source,
            })?;
            staged.push(write);
        }
        Structure::List(items) => {
            let entries = values.as_array().ok_or_else(|| StructureError::ShapeMismatch {
                path: path.clone(),
                expected: "array",
                found: value_kind(values),
            })?;
            if entries.len() > items.len() {
                return Err(StructureError::IndexOutOfRange {
                    path: path.clone(),
                    index: items.len(),
                    len: items.len(),
                });
            }

            for (index, (item, entry)) in items.iter().zip(entries).enumerate() {
                path.push_index(index);
                stage_at(item, entry, path, staged)?;
                path.pop();
            }
        }
        Structure::Map(slots) => {
            let entries = values.as_object().ok_or_else(|| StructureError::ShapeMismatch {
                path: path.clone(),
                expected: "object",
                found: value_kind(values),
            })?;

            for (key, entry) in entries {
                let slot = slots.get(key).ok_or_else(|| StructureError::UnknownKey {
                    path: path.clone(),
                    key: key.clone(),
                })?;
                path.push_key(key);
                stage_at(slot, entry, path, staged)?;
                path.pop();
            }
        }
    }

    Ok(())
}

/// The listener sets of every atom in `structure`, each held once even if
/// its atom sits at several positions.
pub fn collect_listener_sets(structure: &Structure) -> ListenerSets {
    let mut sets = ListenerSets::new();
    collect_into(structure, &mut sets);
    sets
}

fn collect_into(structure: &Structure, sets: &mut ListenerSets) {
    match structure {
        Structure::Leaf(leaf) => {
            sets.insert(leaf.listeners().clone());
        }
        Structure::List(items) => {
            for item in items {
                collect_into(item, sets);
            }
        }
        Structure::Map(entries) => {
            for entry in entries.values() {
                collect_into(entry, sets);
            }
        }
    }
}

/// Build a new plain value with the shape of `structure`, each leaf replaced
/// by its atom's current or initial value.
///
/// Every call allocates fresh containers; nothing is shared with earlier
/// snapshots.
pub fn snapshot(structure: &Structure, kind: SnapshotKind) -> Result<Value, StructureError> {
    snapshot_at(structure, kind, &mut Path::root())
}

fn snapshot_at(
    structure: &Structure,
    kind: SnapshotKind,
    path: &mut Path,
) -> Result<Value, StructureError> {
    match structure {
        Structure::Leaf(leaf) => leaf.to_value(kind).map_err(|source| StructureError::Encode {
            path: path.clone(),
            source,
        }),
        Structure::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push_index(index);
                values.push(snapshot_at(item, kind, path)?);
                path.pop();
            }
            Ok(Value::Array(values))
        }
        Structure::Map(entries) => {
            let mut values = Map::with_capacity(entries.len());
            for (key, entry) in entries {
                path.push_key(key);
                values.insert(key.clone(), snapshot_at(entry, kind, path)?);
                path.pop();
            }
            Ok(Value::Object(values))
        }
    }
}
