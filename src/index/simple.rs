//! Hash-based index with whole-document lookups.

use std::collections::HashMap;

use crate::error::IndexError;
use crate::tree::{NodeId, NodePath};

use super::{DomIndex, IndexCapabilities, IndexKey, IndexKind};

/// Maps each key to the nodes carrying it.
///
/// Entries are stored unsorted together with the path they were added at;
/// [`query`](DomIndex::query) sorts them into document order. Paths are
/// refreshed by the owning document whenever a mutation shifts them.
#[derive(Debug, Default)]
pub struct SimpleIndex {
    entries: HashMap<IndexKey, Vec<(NodePath, NodeId)>>,
    len: usize,
}

impl SimpleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomIndex for SimpleIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Simple
    }

    fn capabilities(&self) -> IndexCapabilities {
        IndexCapabilities {
            lookup: true,
            range: false,
        }
    }

    fn add(&mut self, key: IndexKey, node: NodeId, path: &NodePath) {
        self.entries.entry(key).or_default().push((path.clone(), node));
        self.len += 1;
    }

    fn remove(&mut self, key: &IndexKey, node: NodeId, _path: &NodePath) {
        let Some(list) = self.entries.get_mut(key) else {
            return;
        };
        let before = list.len();
        list.retain(|(_, n)| *n != node);
        self.len -= before - list.len();
        if list.is_empty() {
            self.entries.remove(key);
        }
    }

    fn query(&self, key: &IndexKey) -> Result<Vec<NodeId>, IndexError> {
        let Some(list) = self.entries.get(key) else {
            return Ok(Vec::new());
        };
        let mut sorted: Vec<&(NodePath, NodeId)> = list.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(sorted.into_iter().map(|(_, node)| *node).collect())
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::index::KeyMarker;
    use crate::tree::TokenTable;
    use pretty_assertions::assert_eq;

    fn node(raw: u32) -> NodeId {
        NodeId::from_raw(raw).unwrap()
    }

    #[test]
    fn test_query_returns_document_order() {
        let mut tokens = TokenTable::new();
        let key = IndexKey::new(KeyMarker::Tag, tokens.intern("p"));
        let mut index = SimpleIndex::new();
        index.add(key.clone(), node(5), &NodePath::from_components(vec![1, 2]));
        index.add(key.clone(), node(3), &NodePath::from_components(vec![1, 0, 1]));
        index.add(key.clone(), node(4), &NodePath::from_components(vec![1, 1]));
        assert_eq!(index.query(&key).unwrap(), vec![node(3), node(4), node(5)]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_remove_drops_every_entry_for_node() {
        let mut tokens = TokenTable::new();
        let key = IndexKey::new(KeyMarker::Class, tokens.intern("a"));
        let path = NodePath::from_components(vec![1, 0]);
        let mut index = SimpleIndex::new();
        index.add(key.clone(), node(2), &path);
        index.remove(&key, node(2), &path);
        assert!(index.is_empty());
        assert_eq!(index.query(&key), Ok(Vec::new()));
    }

    #[test]
    fn test_range_query_is_unsupported() {
        let mut tokens = TokenTable::new();
        let key = IndexKey::new(KeyMarker::Id, tokens.intern("x"));
        let index = SimpleIndex::new();
        assert!(matches!(
            index.query_range(&key, &NodePath::from_components(vec![1]), 1, true),
            Err(IndexError::Unsupported { .. })
        ));
    }
}
