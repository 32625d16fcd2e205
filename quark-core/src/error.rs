//! Structure Errors
//!
//! Atoms themselves never fail: reads and writes are infallible. The only
//! fallible operations are the structure helpers, which move values across
//! the boundary between typed atoms and plain `serde_json::Value` trees. Every
//! failure carries the [`Path`] of the offending position so that a bad patch
//! can be traced back to the exact slot it targeted.

use std::fmt;

use smallvec::SmallVec;
use thiserror::Error;

/// One step from a branch to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A key inside a map branch.
    Key(String),
    /// A position inside a list branch.
    Index(usize),
}

/// Location of a slot inside a structure, rendered like `$.user.tags[2]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(SmallVec<[PathSegment; 8]>);

impl Path {
    /// The path of the structure root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The segments from the root down to this slot.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub(crate) fn push_key(&mut self, key: &str) {
        self.0.push(PathSegment::Key(key.to_owned()));
    }

    pub(crate) fn push_index(&mut self, index: usize) {
        self.0.push(PathSegment::Index(index));
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Errors raised while assigning to or snapshotting a structure.
#[derive(Debug, Error)]
pub enum StructureError {
    /// The value at `path` has a different kind than the structure slot.
    #[error("shape mismatch at {path}: expected {expected}, found {found}")]
    ShapeMismatch {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },

    /// A patch names a key that the map branch at `path` does not have.
    #[error("unknown key `{key}` at {path}")]
    UnknownKey { path: Path, key: String },

    /// A patch array is longer than the list branch at `path`.
    #[error("index {index} out of range at {path} (list has {len} entries)")]
    IndexOutOfRange {
        path: Path,
        index: usize,
        len: usize,
    },

    /// A patch value could not be decoded into the atom's type.
    #[error("cannot decode value for atom at {path}: {source}")]
    Decode {
        path: Path,
        #[source]
        source: serde_json::Error,
    },

    /// An atom's value could not be encoded into a snapshot.
    #[error("cannot encode atom value at {path}: {source}")]
    Encode {
        path: Path,
        #[source]
        source: serde_json::Error,
    },
}

impl StructureError {
    /// The path of the slot that caused the error.
    pub fn path(&self) -> &Path {
        match self {
            Self::ShapeMismatch { path, .. }
            | Self::UnknownKey { path, .. }
            | Self::IndexOutOfRange { path, .. }
            | Self::Decode { path, .. }
            | Self::Encode { path, .. } => path,
        }
    }
}

/// Short name of a JSON value's kind, used in shape mismatch errors.
pub(crate) fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_display() {
        let mut path = Path::root();
        assert_eq!(path.to_string(), "$");
        assert!(path.is_root());

        path.push_key("user");
        path.push_key("tags");
        path.push_index(2);
        assert_eq!(path.to_string(), "$.user.tags[2]");

        path.pop();
        assert_eq!(path.to_string(), "$.user.tags");
        assert_eq!(path.segments().len(), 2);
    }

    #[test]
    fn error_messages_include_path() {
        let mut path = Path::root();
        path.push_key("list");

        let err = StructureError::ShapeMismatch {
            path: path.clone(),
            expected: "array",
            found: "string",
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch at $.list: expected array, found string"
        );
        assert_eq!(err.path(), &path);

        let err = StructureError::UnknownKey {
            path: Path::root(),
            key: "missing".into(),
        };
        assert_eq!(err.to_string(), "unknown key `missing` at $");
    }
}
