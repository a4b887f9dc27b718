//! DOM indexes.
//!
//! An index maps a typed, tokenized [`IndexKey`] (tag, id, class, or
//! attribute presence) to the connected elements carrying it, so the selector
//! engine can fetch candidates without walking the tree. Three
//! implementations trade mutation cost against query power:
//!
//! - [`NoIndex`]: maintains nothing. Use it when many structural mutations
//!   will happen before any query.
//! - [`SimpleIndex`]: key to an unsorted list of nodes, sorted into document
//!   order when read. Lookups only cover the whole document.
//! - [`RangedIndex`]: key plus node path in an ordered map, answering prefix
//!   queries bounded to a subtree and depth. Mutations are queued and applied
//!   in one pass by an explicit [`DomIndex::flush`].
//!
//! The engine never inspects the concrete type. It reads an
//! [`IndexCapabilities`] descriptor once per query and always prefers range
//! lookups when they are available.

mod none;
mod ranged;
mod simple;

pub use none::NoIndex;
pub use ranged::RangedIndex;
pub use simple::SimpleIndex;

use std::fmt;

use crate::error::IndexError;
use crate::tree::{NodeId, NodePath, Token};

/// Separates the selector part of a ranged key from the node path.
///
/// The selector part is always exactly two integers long, so the separator
/// never needs to be distinguished from path components.
pub const KEY_SEPARATOR: u32 = 0;

/// The type marker that starts every index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyMarker {
    /// Element tag name (`+`).
    Tag,
    /// Element id (`#`).
    Id,
    /// One class name (`.`).
    Class,
    /// Presence of an attribute (`!`).
    Attribute,
}

impl KeyMarker {
    /// The marker byte stored at the head of a key.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Tag => b'+',
            Self::Id => b'#',
            Self::Class => b'.',
            Self::Attribute => b'!',
        }
    }
}

/// A typed, tokenized lookup key: marker byte followed by a name token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey([u32; 2]);

impl IndexKey {
    /// Creates a key for `token` under `marker`.
    #[must_use]
    pub fn new(marker: KeyMarker, token: Token) -> Self {
        Self([u32::from(marker.as_byte()), token.as_u32()])
    }

    /// The raw key components.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// The marker this key was built with.
    #[must_use]
    pub fn marker(&self) -> Option<KeyMarker> {
        [KeyMarker::Tag, KeyMarker::Id, KeyMarker::Class, KeyMarker::Attribute]
            .into_iter()
            .find(|m| u32::from(m.as_byte()) == self.0[0])
    }

    /// The ranged layout prefix: selector key followed by the separator.
    #[must_use]
    pub fn range_prefix(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(3);
        out.extend_from_slice(&self.0);
        out.push(KEY_SEPARATOR);
        out
    }

    /// The full ranged layout: `[selector key, separator, node path]`.
    #[must_use]
    pub fn with_path(&self, path: &NodePath) -> Vec<u32> {
        let mut out = self.range_prefix();
        out.extend_from_slice(path.as_slice());
        out
    }
}

/// What an index can answer, read once per query by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexCapabilities {
    /// Whole-document lookup by key.
    pub lookup: bool,
    /// Lookup bounded to a subtree path and depth.
    pub range: bool,
}

/// The index implementation a document maintains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// No index.
    None,
    /// Hash of key to node list.
    Simple,
    /// Ordered map supporting subtree range queries.
    #[default]
    Ranged,
}

impl IndexKind {
    /// Builds an empty index of this kind.
    #[must_use]
    pub fn create(self, queue_changes: bool) -> Box<dyn DomIndex> {
        match self {
            Self::None => Box::new(NoIndex::new()),
            Self::Simple => Box::new(SimpleIndex::new()),
            Self::Ranged => Box::new(RangedIndex::new().queue_changes(queue_changes)),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Simple => "simple",
            Self::Ranged => "ranged",
        })
    }
}

/// The node capabilities an index consumes.
///
/// The tree layer implements this; indexes never see node payloads, only the
/// keys a node exposes and where it sits.
pub trait IndexSource {
    /// The keys this node contributes (empty for non-elements).
    fn index_keys(&self, node: NodeId) -> Vec<IndexKey>;

    /// The node's current structural path.
    fn node_path(&self, node: NodeId) -> NodePath;

    /// Children that may themselves carry keys.
    fn indexable_children(&self, node: NodeId) -> Vec<NodeId>;
}

/// Common interface of the index implementations.
///
/// Adding or removing a node processes its whole subtree. Reads require a
/// flushed index: callers run [`flush`](DomIndex::flush) first, and a
/// queued index refuses to answer with [`IndexError::PendingChanges`].
pub trait DomIndex: fmt::Debug {
    /// Which implementation this is.
    fn kind(&self) -> IndexKind;

    /// What queries this index supports.
    fn capabilities(&self) -> IndexCapabilities;

    /// Records `node` under `key` at `path`.
    fn add(&mut self, key: IndexKey, node: NodeId, path: &NodePath);

    /// Removes `node` from under `key`. `path` must be the path it was added with.
    fn remove(&mut self, key: &IndexKey, node: NodeId, path: &NodePath);

    /// Returns every node stored under `key`, in document order.
    ///
    /// # Errors
    ///
    /// Fails if this index cannot answer lookups or has unflushed changes.
    fn query(&self, key: &IndexKey) -> Result<Vec<NodeId>, IndexError>;

    /// Returns nodes under `key` whose path lies below `root`.
    ///
    /// With `include_descendants` false, only nodes exactly `depth` levels
    /// below `root` match; otherwise anything at least `depth` levels below.
    /// `depth == 0` asks whether `root` itself carries the key.
    ///
    /// # Errors
    ///
    /// The default implementation reports the operation as unsupported.
    fn query_range(
        &self,
        key: &IndexKey,
        root: &NodePath,
        depth: usize,
        include_descendants: bool,
    ) -> Result<Vec<NodeId>, IndexError> {
        let _ = (key, root, depth, include_descendants);
        Err(IndexError::Unsupported {
            operation: "range query",
            index: index_name(self.kind()),
        })
    }

    /// Applies queued changes, returning how many were applied.
    fn flush(&mut self) -> usize {
        0
    }

    /// Number of queued changes not yet applied.
    fn pending(&self) -> usize {
        0
    }

    /// Enables or disables change queueing. Disabling flushes immediately.
    fn set_queue_changes(&mut self, queue: bool) {
        let _ = queue;
    }

    /// Whether mutations are queued until the next flush.
    fn queues_changes(&self) -> bool {
        false
    }

    /// Drops every entry and any queued change.
    fn clear(&mut self);

    /// Number of materialised entries (one per key per node).
    fn len(&self) -> usize;

    /// Returns `true` if no entries are materialised.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indexes `node` and every descendant.
    fn add_node(&mut self, source: &dyn IndexSource, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let keys = source.index_keys(current);
            if !keys.is_empty() {
                let path = source.node_path(current);
                for key in keys {
                    self.add(key, current, &path);
                }
            }
            stack.extend(source.indexable_children(current));
        }
    }

    /// Removes `node` and every descendant, using their current paths.
    fn remove_node(&mut self, source: &dyn IndexSource, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let keys = source.index_keys(current);
            if !keys.is_empty() {
                let path = source.node_path(current);
                for key in &keys {
                    self.remove(key, current, &path);
                }
            }
            stack.extend(source.indexable_children(current));
        }
    }
}

/// Human-readable name used in capability errors.
pub(crate) fn index_name(kind: IndexKind) -> &'static str {
    match kind {
        IndexKind::None => "none",
        IndexKind::Simple => "simple",
        IndexKind::Ranged => "ranged",
    }
}
