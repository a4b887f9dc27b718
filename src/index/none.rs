//! The empty index.

use crate::error::IndexError;
use crate::tree::{NodeId, NodePath};

use super::{DomIndex, IndexCapabilities, IndexKey, IndexKind};

/// An index that stores nothing and answers no queries.
///
/// Documents using it pay nothing on mutation; every query falls back to a
/// tree walk.
#[derive(Debug, Default)]
pub struct NoIndex;

impl NoIndex {
    /// Creates the index.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DomIndex for NoIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::None
    }

    fn capabilities(&self) -> IndexCapabilities {
        IndexCapabilities::default()
    }

    fn add(&mut self, _key: IndexKey, _node: NodeId, _path: &NodePath) {}

    fn remove(&mut self, _key: &IndexKey, _node: NodeId, _path: &NodePath) {}

    fn query(&self, _key: &IndexKey) -> Result<Vec<NodeId>, IndexError> {
        Err(IndexError::Unsupported {
            operation: "lookup",
            index: "none",
        })
    }

    fn clear(&mut self) {}

    fn len(&self) -> usize {
        0
    }
}
