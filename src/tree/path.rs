//! Structural node paths.
//!
//! A [`NodePath`] encodes where a node sits: the raw id of the subtree root
//! it hangs from (the document node for connected nodes, a fragment node
//! otherwise), followed by the child position at every level down to the
//! node. Lexicographic comparison of paths is document order, and a node's
//! path is always a strict extension of its parent's path.

use std::fmt;

/// A node's position from the root of its tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<u32>);

impl NodePath {
    /// Creates a path from raw components.
    #[must_use]
    pub fn from_components(components: Vec<u32>) -> Self {
        Self(components)
    }

    /// Returns the raw components.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of components (the tree root has length 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty path, which no node has.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Returns a copy of this path extended by one child position.
    #[must_use]
    pub fn child(&self, position: u32) -> Self {
        let mut components = Vec::with_capacity(self.0.len() + 1);
        components.extend_from_slice(&self.0);
        components.push(position);
        Self(components)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}
