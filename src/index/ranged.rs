//! Ordered index supporting subtree range queries.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;

use tracing::trace;

use crate::error::IndexError;
use crate::tree::{NodeId, NodePath};

use super::{DomIndex, IndexCapabilities, IndexKey, IndexKind};

/// A mutation waiting to be applied.
#[derive(Debug, Clone)]
enum PendingChange {
    Add(Vec<u32>, NodeId),
    Remove(Vec<u32>, NodeId),
}

/// Ordered map from `[selector key, separator, node path]` to node.
///
/// Because paths sort in document order, every node carrying a key lies in
/// one contiguous run of the map, and every node inside a given subtree lies
/// in one contiguous sub-run. A range query is therefore a single ordered
/// scan with no sorting.
///
/// With queueing enabled (the default), [`add`](DomIndex::add) and
/// [`remove`](DomIndex::remove) only record the change. Changes are applied
/// in FIFO order by [`flush`](DomIndex::flush); reading before that fails
/// with [`IndexError::PendingChanges`].
#[derive(Debug)]
pub struct RangedIndex {
    entries: BTreeMap<Vec<u32>, NodeId>,
    queue: VecDeque<PendingChange>,
    queue_changes: bool,
}

impl Default for RangedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RangedIndex {
    /// Creates an empty index with queueing enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            queue: VecDeque::new(),
            queue_changes: true,
        }
    }

    /// Sets whether mutations are queued (builder style).
    #[must_use]
    pub fn queue_changes(mut self, queue: bool) -> Self {
        self.queue_changes = queue;
        self
    }

    fn submit(&mut self, change: PendingChange) {
        if self.queue_changes {
            self.queue.push_back(change);
        } else {
            self.apply(change);
        }
    }

    fn apply(&mut self, change: PendingChange) {
        match change {
            PendingChange::Add(key, node) => {
                self.entries.insert(key, node);
            }
            PendingChange::Remove(key, node) => {
                if self.entries.get(&key) == Some(&node) {
                    self.entries.remove(&key);
                }
            }
        }
    }

    fn check_flushed(&self) -> Result<(), IndexError> {
        if self.queue.is_empty() {
            Ok(())
        } else {
            Err(IndexError::PendingChanges {
                pending: self.queue.len(),
            })
        }
    }

    /// Yields `(relative depth, node)` for every entry whose key starts with
    /// `prefix`, in document order.
    fn scan<'a>(&'a self, prefix: &'a [u32]) -> impl Iterator<Item = (usize, NodeId)> + 'a {
        self.entries
            .range::<[u32], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(move |(key, node)| (key.len() - prefix.len(), *node))
    }
}

impl DomIndex for RangedIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Ranged
    }

    fn capabilities(&self) -> IndexCapabilities {
        IndexCapabilities {
            lookup: true,
            range: true,
        }
    }

    fn add(&mut self, key: IndexKey, node: NodeId, path: &NodePath) {
        self.submit(PendingChange::Add(key.with_path(path), node));
    }

    fn remove(&mut self, key: &IndexKey, node: NodeId, path: &NodePath) {
        self.submit(PendingChange::Remove(key.with_path(path), node));
    }

    fn query(&self, key: &IndexKey) -> Result<Vec<NodeId>, IndexError> {
        self.check_flushed()?;
        let prefix = key.range_prefix();
        Ok(self.scan(&prefix).map(|(_, node)| node).collect())
    }

    fn query_range(
        &self,
        key: &IndexKey,
        root: &NodePath,
        depth: usize,
        include_descendants: bool,
    ) -> Result<Vec<NodeId>, IndexError> {
        self.check_flushed()?;
        let prefix = key.with_path(root);
        Ok(self
            .scan(&prefix)
            .filter(|&(relative, _)| {
                if include_descendants {
                    relative >= depth
                } else {
                    relative == depth
                }
            })
            .map(|(_, node)| node)
            .collect())
    }

    fn flush(&mut self) -> usize {
        let applied = self.queue.len();
        while let Some(change) = self.queue.pop_front() {
            self.apply(change);
        }
        if applied > 0 {
            trace!(applied, entries = self.entries.len(), "flushed ranged index");
        }
        applied
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn set_queue_changes(&mut self, queue: bool) {
        self.queue_changes = queue;
        if !queue {
            self.flush();
        }
    }

    fn queues_changes(&self) -> bool {
        self.queue_changes
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.queue.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
