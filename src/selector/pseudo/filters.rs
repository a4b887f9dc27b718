//! jQuery's positional pseudo-classes: `:eq`, `:lt`, `:gt`, `:first`,
//! `:last`, `:odd`, `:even`.
//!
//! These index into the result sequence, not the tree, so `li:first`
//! is the first `li` selected rather than the first child. Indexes are
//! 0-based; negative arguments count back from the end.

use crate::error::Result;
use crate::tree::{Document, NodeId};

use super::FilterPseudo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Positional {
    Eq(i64),
    Lt(i64),
    Gt(i64),
    Odd,
    Even,
}

impl Positional {
    pub(super) fn first() -> Self {
        Self::Eq(0)
    }

    pub(super) fn last() -> Self {
        Self::Eq(-1)
    }
}

/// Resolves a possibly negative index against a sequence of `len` items.
fn resolve(index: i64, len: usize) -> i64 {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    if index < 0 {
        len + index
    } else {
        index
    }
}

impl FilterPseudo for Positional {
    fn filter(&self, _doc: &Document, selection: &[NodeId]) -> Result<Vec<NodeId>> {
        let len = selection.len();
        let keep = |i: i64| -> bool {
            match *self {
                Self::Eq(n) => i == resolve(n, len),
                Self::Lt(n) => i < resolve(n, len),
                Self::Gt(n) => i > resolve(n, len),
                Self::Odd => i % 2 == 1,
                Self::Even => i % 2 == 0,
            }
        };
        Ok((0_i64..)
            .zip(selection)
            .filter(|&(i, _)| keep(i))
            .map(|(_, &node)| node)
            .collect())
    }
}
