//! Compiled selectors.
//!
//! A [`Selector`] is an ordered list of [`SelectorClause`]s. Each
//! comma-separated alternative starts with a `Root` clause; the clauses
//! after it either chain onto the previous result or are `Grouped` with it,
//! reading the same source and adding to the same result.
//!
//! ```
//! use selectoxide::{Document, Selector};
//!
//! let mut doc = Document::parse_html("<ul><li>a</li><li class=x>b</li></ul>").unwrap();
//! let selector = Selector::parse("ul > li.x").unwrap();
//! let found = selector.select(&mut doc, None).unwrap();
//! assert_eq!(doc.text_content(found[0]), "b");
//! ```

mod attribute;
mod clause;
mod engine;
mod parser;
pub mod pseudo;

pub use attribute::matches as attribute_matches;
pub use clause::{
    AttributeSelectorType, AttributeTest, CombinatorType, PseudoClause, SelectorClause,
    SelectorType, StringComparison, TraversalType,
};

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, SelectorError};
use crate::tree::{Document, NodeId};

use engine::Engine;
use pseudo::PseudoRegistry;

/// A compiled selector.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    clauses: Vec<SelectorClause>,
}

impl Selector {
    /// Compiles `text` against the global pseudo-class registry.
    ///
    /// # Errors
    ///
    /// Returns `Syntax` for malformed text, `NotImplemented` for browser-state
    /// pseudo-classes and pseudo-elements, `UnknownPseudoSelector` for
    /// unregistered names, and `InvalidArguments` when a pseudo-class rejects
    /// its argument.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, PseudoRegistry::global())
    }

    /// Compiles `text`, resolving pseudo-classes through `registry`.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn parse_with(text: &str, registry: &PseudoRegistry) -> Result<Self> {
        let clauses = parser::parse(text, registry)?;
        debug!(selector = text, clauses = clauses.len(), "compiled selector");
        Ok(Self { clauses })
    }

    /// Wraps clauses built by hand.
    #[must_use]
    pub fn from_clauses(clauses: Vec<SelectorClause>) -> Self {
        Self { clauses }
    }

    /// A selector matching exactly `nodes`, wherever they fall inside the
    /// query context.
    #[must_use]
    pub fn from_elements(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let clause = SelectorClause {
            selector_type: SelectorType::ELEMENTS,
            elements: nodes.into_iter().collect(),
            ..SelectorClause::default()
        };
        Self {
            clauses: vec![clause],
        }
    }

    /// The clause chain.
    #[must_use]
    pub fn clauses(&self) -> &[SelectorClause] {
        &self.clauses
    }

    /// Number of clauses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Returns `true` if there are no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns `true` if this is an HTML fragment rather than a query.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.html().is_some()
    }

    fn html(&self) -> Option<&str> {
        self.clauses
            .first()
            .filter(|c| c.selector_type.contains(SelectorType::HTML))
            .map(|c| c.html.as_deref().unwrap_or_default())
    }

    /// Selects matching nodes in document order, without duplicates.
    ///
    /// With no `context` the whole document is searched. With a context,
    /// the first clause of each alternative applies to the context nodes and
    /// their subtrees. The document index is flushed first.
    ///
    /// An HTML selector creates its nodes as a disconnected fragment and
    /// returns them.
    ///
    /// # Errors
    ///
    /// Returns `Html` if an HTML selector cannot be parsed, and `Invariant`
    /// for hand-built clause chains the engine cannot run.
    pub fn select(&self, doc: &mut Document, context: Option<&[NodeId]>) -> Result<Vec<NodeId>> {
        doc.flush_index();
        if let Some(html) = self.html() {
            return Ok(doc.create_fragment(html)?);
        }
        self.select_in(doc, context)
    }

    /// [`select`](Self::select) against a document whose index is already
    /// flushed.
    pub(crate) fn select_in(&self, doc: &Document, context: Option<&[NodeId]>) -> Result<Vec<NodeId>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if self.is_html() {
            return Err(SelectorError::Invariant(
                "HTML selectors need a mutable document".to_owned(),
            ));
        }
        Engine::new(doc, &self.clauses, context).select(context)
    }

    /// Returns the members of `sequence` that match, in `sequence` order.
    ///
    /// Compound alternatives (no combinators) are applied to `sequence`
    /// itself, so positional pseudo-classes count within it: `:eq(1)` keeps
    /// the second node of `sequence`. Alternatives with combinators keep the
    /// nodes they select from the whole document.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn filter(&self, doc: &mut Document, sequence: &[NodeId]) -> Result<Vec<NodeId>> {
        doc.flush_index();
        self.filter_in(doc, sequence)
    }

    pub(crate) fn filter_in(&self, doc: &Document, sequence: &[NodeId]) -> Result<Vec<NodeId>> {
        let mut matched: HashSet<NodeId> = HashSet::new();
        for group in self.groups() {
            let group = Self::from_clauses(group.to_vec());
            let found = if is_compound(&group.clauses) {
                group.to_filter_selector().select_in(doc, Some(sequence))?
            } else {
                group.select_in(doc, None)?
            };
            matched.extend(found);
        }
        Ok(sequence
            .iter()
            .copied()
            .filter(|node| matched.contains(node))
            .collect())
    }

    /// Returns `true` if `node` matches.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn matches(&self, doc: &mut Document, node: NodeId) -> Result<bool> {
        Ok(!self.filter(doc, &[node])?.is_empty())
    }

    /// Returns the members of `sequence` that are not selected in the whole
    /// document, in `sequence` order.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn except(&self, doc: &mut Document, sequence: &[NodeId]) -> Result<Vec<NodeId>> {
        doc.flush_index();
        let selected: HashSet<NodeId> = self.select_in(doc, None)?.into_iter().collect();
        Ok(sequence
            .iter()
            .copied()
            .filter(|node| !selected.contains(node))
            .collect())
    }

    /// A copy whose alternatives test the context nodes themselves instead
    /// of searching below them.
    #[must_use]
    pub fn to_filter_selector(&self) -> Self {
        self.retarget(|clause| clause.traversal = TraversalType::Filter)
    }

    /// A copy whose alternatives search strictly below the context nodes,
    /// as jQuery's `find` does.
    #[must_use]
    pub fn to_context_selector(&self) -> Self {
        self.retarget(|clause| {
            if clause.combinator == CombinatorType::Root {
                clause.combinator = CombinatorType::Context;
            }
            if clause.traversal == TraversalType::All {
                clause.traversal = TraversalType::Descendant;
            }
        })
    }

    /// Applies `change` to each alternative's first clause and the clauses
    /// grouped with it.
    fn retarget(&self, change: impl Fn(&mut SelectorClause)) -> Self {
        let mut copy = self.clone();
        let mut leading = false;
        for clause in &mut copy.clauses {
            leading = match clause.combinator {
                CombinatorType::Root | CombinatorType::Context => true,
                CombinatorType::Grouped => leading,
                CombinatorType::Chained => false,
            };
            if leading {
                change(clause);
            }
        }
        copy
    }

    /// Splits the chain into comma-separated alternatives.
    fn groups(&self) -> impl Iterator<Item = &[SelectorClause]> {
        let starts: Vec<usize> = self
            .clauses
            .iter()
            .enumerate()
            .filter(|(i, c)| {
                *i == 0 || matches!(c.combinator, CombinatorType::Root | CombinatorType::Context)
            })
            .map(|(i, _)| i)
            .collect();
        let ends: Vec<usize> = starts
            .iter()
            .skip(1)
            .copied()
            .chain(std::iter::once(self.clauses.len()))
            .collect();
        starts
            .into_iter()
            .zip(ends)
            .map(move |(start, end)| &self.clauses[start..end])
    }
}

/// An alternative is compound when nothing after its first clause moves
/// away from the nodes it selected.
fn is_compound(group: &[SelectorClause]) -> bool {
    group.iter().skip(1).all(|clause| {
        clause.combinator == CombinatorType::Grouped || clause.traversal == TraversalType::Filter
    })
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl fmt::Display for Selector {
    /// Renders the chain as selector text. A run of clauses expanded from a
    /// jQuery pseudo-class such as `:input` renders as that pseudo-class.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut expansion: Option<&str> = None;
        for (i, clause) in self.clauses.iter().enumerate() {
            let expanded = clause.expanded_from.as_deref();
            let continues_run = clause.combinator == CombinatorType::Grouped
                && expanded.is_some()
                && expanded == expansion;
            if continues_run {
                continue;
            }
            expansion = expanded;
            let prefix = match (clause.combinator, clause.traversal) {
                (CombinatorType::Root | CombinatorType::Context | CombinatorType::Grouped, traversal) => {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match traversal {
                        TraversalType::Child => "> ",
                        TraversalType::Adjacent => "+ ",
                        TraversalType::Sibling => "~ ",
                        _ => "",
                    }
                }
                (CombinatorType::Chained, TraversalType::Filter) => "",
                (CombinatorType::Chained, TraversalType::Child) => " > ",
                (CombinatorType::Chained, TraversalType::Adjacent) => " + ",
                (CombinatorType::Chained, TraversalType::Sibling) => " ~ ",
                (CombinatorType::Chained, TraversalType::Descendant | TraversalType::All) => " ",
            };
            f.write_str(prefix)?;
            match expanded {
                Some(name) => write!(f, ":{name}")?,
                None => clause.fmt_tests(f)?,
            }
        }
        Ok(())
    }
}
