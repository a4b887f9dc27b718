//! Clause-chain execution.
//!
//! Each clause maps a source node set to a result set. Where the document
//! index can answer one of the clause's tests, that test is answered by the
//! index and the remaining tests filter its candidates in place; otherwise
//! the source subtrees are walked with an explicit worklist.

use std::collections::HashSet;

use tracing::trace;

use crate::error::{Result, SelectorError};
use crate::index::{IndexCapabilities, IndexKey, KeyMarker};
use crate::tree::{Document, NodeId};

use super::attribute;
use super::clause::{
    AttributeSelectorType, CombinatorType, SelectorClause, SelectorType, TraversalType,
};
use super::pseudo::PseudoSelector;

/// Where a clause reads its input from.
#[derive(Debug, Clone)]
enum Source {
    /// The whole document, rooted at the document node.
    Document,
    /// An explicit node list.
    Nodes(Vec<NodeId>),
}

impl Source {
    fn nodes(&self, doc: &Document) -> Vec<NodeId> {
        match self {
            Self::Document => vec![doc.root()],
            Self::Nodes(nodes) => nodes.clone(),
        }
    }
}

/// A worklist frame: a node and its distance below the clause's source.
#[derive(Debug, Clone, Copy)]
struct MatchElement {
    node: NodeId,
    depth: usize,
}

/// Runs a clause chain against one document.
pub(crate) struct Engine<'a> {
    doc: &'a Document,
    clauses: &'a [SelectorClause],
    capabilities: IndexCapabilities,
}

impl<'a> Engine<'a> {
    /// Binds `clauses` to `doc`, deciding once whether the index may be used.
    ///
    /// The index is off while it has unflushed changes, and when the first
    /// context node is not part of the document tree.
    pub(crate) fn new(
        doc: &'a Document,
        clauses: &'a [SelectorClause],
        context: Option<&[NodeId]>,
    ) -> Self {
        let connected = context
            .and_then(<[NodeId]>::first)
            .map_or(true, |&node| doc.is_connected(node));
        let capabilities = if connected && doc.pending_index_changes() == 0 {
            doc.index().capabilities()
        } else {
            IndexCapabilities::default()
        };
        Self {
            doc,
            clauses,
            capabilities,
        }
    }

    /// Returns the matches in document order without duplicates.
    pub(crate) fn select(&self, context: Option<&[NodeId]>) -> Result<Vec<NodeId>> {
        let root_source = match context {
            None => Source::Document,
            Some(nodes) => Source::Nodes(nodes.to_vec()),
        };

        let mut output = Vec::new();
        let mut last_result: Option<Vec<NodeId>> = None;
        let mut group_source: Option<Source> = None;

        for clause in self.clauses {
            let source = match clause.combinator {
                CombinatorType::Root | CombinatorType::Context => {
                    if let Some(previous) = last_result.take() {
                        output.extend(previous);
                    }
                    root_source.clone()
                }
                CombinatorType::Chained => Source::Nodes(last_result.take().ok_or_else(|| {
                    SelectorError::Invariant("chained clause has no preceding clause".to_owned())
                })?),
                CombinatorType::Grouped => group_source
                    .clone()
                    .unwrap_or_else(|| root_source.clone()),
            };

            let result = self.select_clause(clause, &source)?;
            if clause.combinator == CombinatorType::Grouped {
                last_result.get_or_insert_with(Vec::new).extend(result);
            } else {
                last_result = Some(result);
            }
            group_source = Some(source);
        }

        output.extend(last_result.unwrap_or_default());
        Ok(document_order(self.doc, output))
    }

    fn select_clause(&self, clause: &SelectorClause, source: &Source) -> Result<Vec<NodeId>> {
        let ty = clause.selector_type;
        if ty.is_empty() {
            return Err(invariant("clause without a selector type reached the engine"));
        }
        if ty.contains(SelectorType::HTML) {
            return Err(invariant("HTML clause reached the engine"));
        }
        if ty.contains(SelectorType::NONE) {
            return Ok(Vec::new());
        }

        let doc = self.doc;
        let mut whole_document = matches!(source, Source::Document);
        let mut traversal = clause.traversal;
        let mut roots = source.nodes(doc);
        match traversal {
            TraversalType::Adjacent => {
                roots = roots
                    .into_iter()
                    .filter_map(|node| doc.next_element_sibling(node))
                    .collect();
                traversal = TraversalType::Filter;
                whole_document = false;
            }
            TraversalType::Sibling => {
                roots = roots
                    .into_iter()
                    .flat_map(|node| following_siblings(doc, node))
                    .collect();
                traversal = TraversalType::Filter;
                whole_document = false;
            }
            _ => {}
        }

        let (mut depth, mut descendants) = match traversal {
            TraversalType::Child => (clause.child_depth, false),
            TraversalType::Filter => (0, false),
            TraversalType::Descendant => (1, true),
            TraversalType::All => (0, true),
            TraversalType::Adjacent | TraversalType::Sibling => {
                return Err(invariant("sibling traversal was not normalized"));
            }
        };
        let ordered = traversal != TraversalType::Filter;

        let mut remaining = ty;
        let mut candidates = roots;
        if let Some((satisfied, found)) =
            self.index_lookup(clause, &candidates, whole_document, depth, descendants)?
        {
            trace!(
                traversal = ?clause.traversal,
                candidates = found.len(),
                "index lookup"
            );
            remaining.remove(satisfied);
            candidates = if ordered {
                document_order(doc, found)
            } else {
                unique(found)
            };
            depth = 0;
            descendants = false;
            if remaining.is_empty() {
                return Ok(candidates);
            }
        }

        let pseudo = clause
            .pseudo
            .as_ref()
            .filter(|_| remaining.contains(SelectorType::PSEUDO_CLASS))
            .map(|p| &p.selector);
        let result = match pseudo {
            Some(PseudoSelector::Filter(filter)) => {
                let tests = remaining - SelectorType::PSEUDO_CLASS;
                let mut sequence = self.walk(clause, tests, &candidates, depth, descendants)?;
                if ordered {
                    sequence = document_order(doc, sequence);
                }
                filter.filter(doc, &sequence)?
            }
            Some(PseudoSelector::Element(pseudo))
                if remaining == SelectorType::PSEUDO_CLASS && depth == 1 && !descendants =>
            {
                let mut parents = HashSet::new();
                let mut found = Vec::new();
                for parent in candidates {
                    if parents.insert(parent) {
                        found.extend(pseudo.matching_children(doc, parent)?);
                    }
                }
                document_order(doc, found)
            }
            _ => {
                let found = self.walk(clause, remaining, &candidates, depth, descendants)?;
                if ordered {
                    document_order(doc, found)
                } else {
                    found
                }
            }
        };
        trace!(
            combinator = ?clause.combinator,
            traversal = ?clause.traversal,
            matched = result.len(),
            "clause evaluated"
        );
        Ok(result)
    }

    /// Answers one of the clause's tests from the index, if possible.
    ///
    /// Returns the test bits the lookup satisfied and the candidates it
    /// produced, which already respect `depth` and `descendants`.
    fn index_lookup(
        &self,
        clause: &SelectorClause,
        roots: &[NodeId],
        whole_document: bool,
        depth: usize,
        descendants: bool,
    ) -> Result<Option<(SelectorType, Vec<NodeId>)>> {
        if clause.no_index {
            return Ok(None);
        }
        let Some((satisfied, marker, name)) = index_target(clause) else {
            return Ok(None);
        };
        let doc = self.doc;
        let use_range =
            self.capabilities.range && roots.iter().all(|&root| doc.is_connected(root));
        let use_lookup =
            !use_range && self.capabilities.lookup && whole_document && descendants;
        if !use_range && !use_lookup {
            return Ok(None);
        }

        // A name the document never interned cannot be on any node.
        let Some(token) = doc.tokens().get(name) else {
            return Ok(Some((satisfied, Vec::new())));
        };
        let key = IndexKey::new(marker, token);
        let index = doc.index();
        let found = if use_range {
            let mut found = Vec::new();
            for &root in roots {
                found.extend(index.query_range(&key, &doc.node_path(root), depth, descendants)?);
            }
            found
        } else {
            index.query(&key)?
        };
        Ok(Some((satisfied, found)))
    }

    /// Walks `roots` and collects elements at the requested depth passing
    /// `tests`. With `descendants`, every element at least `depth` levels
    /// down qualifies. An empty `tests` accepts any element.
    fn walk(
        &self,
        clause: &SelectorClause,
        tests: SelectorType,
        roots: &[NodeId],
        depth: usize,
        descendants: bool,
    ) -> Result<Vec<NodeId>> {
        let doc = self.doc;
        let elements: HashSet<NodeId> = if tests.contains(SelectorType::ELEMENTS) {
            clause.elements.iter().copied().collect()
        } else {
            HashSet::new()
        };

        let mut found = Vec::new();
        // Below `depth` every level behaves the same when descending, so
        // those frames share one visited key.
        let mut visited: HashSet<(NodeId, usize)> = HashSet::new();
        let mut stack: Vec<MatchElement> = roots
            .iter()
            .rev()
            .map(|&node| MatchElement { node, depth: 0 })
            .collect();

        while let Some(frame) = stack.pop() {
            let level = if descendants {
                frame.depth.min(depth)
            } else {
                frame.depth
            };
            if !visited.insert((frame.node, level)) {
                continue;
            }
            let at_target = if descendants {
                frame.depth >= depth
            } else {
                frame.depth == depth
            };
            if at_target && self.matches(clause, tests, &elements, frame.node)? {
                found.push(frame.node);
            }
            if descendants || frame.depth < depth {
                let children: Vec<NodeId> = doc.element_children(frame.node).collect();
                stack.extend(children.into_iter().rev().map(|node| MatchElement {
                    node,
                    depth: frame.depth + 1,
                }));
            }
        }
        Ok(found)
    }

    fn matches(
        &self,
        clause: &SelectorClause,
        tests: SelectorType,
        elements: &HashSet<NodeId>,
        node: NodeId,
    ) -> Result<bool> {
        let doc = self.doc;
        if !doc.is_element(node) || tests.contains(SelectorType::NONE) {
            return Ok(false);
        }
        if tests.contains(SelectorType::TAG) {
            let tag = payload(clause.tag.as_deref(), "tag")?;
            if !doc
                .tag_name(node)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            {
                return Ok(false);
            }
        }
        if tests.contains(SelectorType::ID)
            && doc.element_id(node) != Some(payload(clause.id.as_deref(), "id")?)
        {
            return Ok(false);
        }
        if tests.contains(SelectorType::CLASS)
            && !doc.has_class(node, payload(clause.class.as_deref(), "class")?)
        {
            return Ok(false);
        }
        if tests.contains(SelectorType::ATTRIBUTE_VALUE)
            && !attribute::matches(doc, node, payload(clause.attribute.as_ref(), "attribute")?)
        {
            return Ok(false);
        }
        if tests.contains(SelectorType::ELEMENTS) && !elements.contains(&node) {
            return Ok(false);
        }
        if tests.contains(SelectorType::PSEUDO_CLASS) {
            match &payload(clause.pseudo.as_ref(), "pseudo-class")?.selector {
                PseudoSelector::Element(pseudo) => return pseudo.matches(doc, node),
                PseudoSelector::Filter(_) => {
                    return Err(invariant("result-list pseudo-class reached the element matcher"))
                }
            }
        }
        Ok(true)
    }
}

/// The test the index answers for `clause`, by priority: id, class, tag,
/// then a positive attribute test. An attribute test with a value operator
/// is only narrowed by the index, so its bit is not reported satisfied.
fn index_target(clause: &SelectorClause) -> Option<(SelectorType, KeyMarker, &str)> {
    let ty = clause.selector_type;
    if ty.contains(SelectorType::ID) {
        return Some((SelectorType::ID, KeyMarker::Id, clause.id.as_deref()?));
    }
    if ty.contains(SelectorType::CLASS) {
        return Some((SelectorType::CLASS, KeyMarker::Class, clause.class.as_deref()?));
    }
    if ty.contains(SelectorType::TAG) {
        return Some((SelectorType::TAG, KeyMarker::Tag, clause.tag.as_deref()?));
    }
    if ty.contains(SelectorType::ATTRIBUTE_VALUE) {
        let test = clause.attribute.as_ref()?;
        let satisfied = match test.operator {
            AttributeSelectorType::NotExists | AttributeSelectorType::NotEquals => return None,
            AttributeSelectorType::Exists => SelectorType::ATTRIBUTE_VALUE,
            _ => SelectorType::empty(),
        };
        return Some((satisfied, KeyMarker::Attribute, test.name.as_str()));
    }
    None
}

fn following_siblings(doc: &Document, node: NodeId) -> Vec<NodeId> {
    std::iter::successors(doc.next_element_sibling(node), |&n| doc.next_element_sibling(n))
        .collect()
}

/// Sorts by node path and removes duplicates.
pub(crate) fn document_order(doc: &Document, mut nodes: Vec<NodeId>) -> Vec<NodeId> {
    nodes.sort_by_cached_key(|&node| doc.node_path(node));
    nodes.dedup();
    nodes
}

/// Removes duplicates, keeping first occurrences in place.
fn unique(nodes: Vec<NodeId>) -> Vec<NodeId> {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes.into_iter().filter(|&node| seen.insert(node)).collect()
}

fn payload<'c, T: ?Sized>(value: Option<&'c T>, what: &str) -> Result<&'c T> {
    value.ok_or_else(|| invariant(&format!("clause has the {what} bit but no {what}")))
}

fn invariant(message: &str) -> SelectorError {
    SelectorError::Invariant(message.to_owned())
}
