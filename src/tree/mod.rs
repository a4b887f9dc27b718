//! Arena-based HTML document tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the [`Document`]
//! and are referenced by [`NodeId`], a newtype over `NonZeroU32`. Navigation
//! links (parent, first\_child, last\_child, next\_sibling, prev\_sibling) are
//! arena indices, and every node additionally records its `position` among
//! its parent's children so that a [`NodePath`] can be computed by walking
//! up the parent chain.
//!
//! # Index maintenance
//!
//! Each document owns one [`DomIndex`]. Every mutation that touches a node
//! connected to the document node calls the index hooks: the affected
//! subtrees are removed under their old paths before the change and added
//! under their new paths after it. Inserting or detaching a node shifts the
//! positions of its later siblings, so those siblings are re-indexed too.
//! Nodes under a fragment are never indexed.

mod node;
mod path;
pub mod tokens;

pub use node::{Attribute, NodeKind, NodeType};
pub use path::NodePath;
pub use tokens::{Token, TokenTable};

use std::num::NonZeroU32;

use tracing::debug;

use crate::error::{HtmlError, Result};
use crate::html::{self, HtmlParseOptions};
use crate::index::{DomIndex, IndexKey, IndexKind, IndexSource, KeyMarker, NoIndex};
use crate::scanner::chars::is_html_whitespace;
use crate::selector::Selector;

/// A typed index into the document's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, meaning it can never be zero
/// and `Option<NodeId>` has the same size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }

    /// Converts this `NodeId` to its raw `u32` value (always non-zero).
    #[must_use]
    pub fn into_raw(self) -> u32 {
        self.0.get()
    }

    /// Creates a `NodeId` from a raw `u32`, if non-zero.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }
}

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node, if any.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
    /// Index among the parent's children. Zero for unattached nodes.
    pub position: u32,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
            position: 0,
        }
    }
}

/// Options controlling how a [`Document`] maintains its index.
///
/// # Examples
///
/// ```
/// use selectoxide::{Document, DocumentOptions, IndexKind};
///
/// let doc = Document::with_options(
///     DocumentOptions::new().index(IndexKind::Simple).queue_changes(false),
/// );
/// assert_eq!(doc.index_kind(), IndexKind::Simple);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DocumentOptions {
    /// Which index implementation to maintain.
    pub index: IndexKind,
    /// Whether the ranged index batches mutations until the next flush.
    pub queue_changes: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            index: IndexKind::Ranged,
            queue_changes: true,
        }
    }
}

impl DocumentOptions {
    /// Creates the default options: ranged index with queueing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the index implementation.
    #[must_use]
    pub fn index(mut self, kind: IndexKind) -> Self {
        self.index = kind;
        self
    }

    /// Enables or disables batching of index mutations.
    #[must_use]
    pub fn queue_changes(mut self, yes: bool) -> Self {
        self.queue_changes = yes;
        self
    }
}

/// An HTML document.
///
/// The `Document` owns all nodes in an arena together with the name
/// tokenizer and the index. Navigation goes through `&Document`; mutation
/// and querying go through `&mut Document`, because queries flush the
/// index before reading it.
///
/// # Examples
///
/// ```
/// use selectoxide::Document;
///
/// let mut doc = Document::parse_html("<ul><li>a</li><li class=x>b</li></ul>").unwrap();
/// let hits = doc.select("li.x").unwrap();
/// assert_eq!(hits.len(), 1);
/// assert_eq!(doc.text_content(hits[0]), "b");
/// ```
#[derive(Debug)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The document node id.
    root: NodeId,
    tokens: TokenTable,
    index: Box<dyn DomIndex>,
}

impl Document {
    /// Creates a new empty document with the default index.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(DocumentOptions::default())
    }

    /// Creates a new empty document with the given options.
    #[must_use]
    pub fn with_options(options: DocumentOptions) -> Self {
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32)
        nodes.push(NodeData::new(NodeKind::Document));
        // Index 1: the document node
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            root: NodeId::from_index(1),
            tokens: TokenTable::new(),
            index: options.index.create(options.queue_changes),
        }
    }

    /// Parses an HTML string into a new document with default options.
    ///
    /// Top-level nodes of the input become children of the document node;
    /// no implied `html`/`head`/`body` elements are created.
    ///
    /// # Errors
    ///
    /// Returns `HtmlError` if the input nests deeper than the parser allows.
    pub fn parse_html(input: &str) -> Result<Self, HtmlError> {
        Self::parse_html_with_options(input, &HtmlParseOptions::default())
    }

    /// Parses an HTML string with explicit parser options.
    ///
    /// # Errors
    ///
    /// Returns `HtmlError` if the input nests deeper than the parser allows.
    pub fn parse_html_with_options(
        input: &str,
        options: &HtmlParseOptions,
    ) -> Result<Self, HtmlError> {
        let mut doc = Self::new();
        let root = doc.root;
        doc.append_html_with_options(root, input, options)?;
        Ok(doc)
    }

    /// Parses `input` and appends the resulting nodes to `parent`.
    ///
    /// Returns the appended top-level nodes.
    ///
    /// # Errors
    ///
    /// Returns `HtmlError` if the input nests deeper than the parser allows.
    pub fn append_html(
        &mut self,
        parent: NodeId,
        input: &str,
    ) -> Result<Vec<NodeId>, HtmlError> {
        self.append_html_with_options(parent, input, &HtmlParseOptions::default())
    }

    fn append_html_with_options(
        &mut self,
        parent: NodeId,
        input: &str,
        options: &HtmlParseOptions,
    ) -> Result<Vec<NodeId>, HtmlError> {
        let fragment = html::parse_fragment(self, input, options)?;
        let nodes: Vec<NodeId> = self.children(fragment).collect();
        for &node in &nodes {
            self.append_child(parent, node);
        }
        Ok(nodes)
    }

    /// Parses `input` into a fresh, disconnected fragment and returns the
    /// fragment's top-level nodes.
    ///
    /// Fragment nodes are never indexed.
    ///
    /// # Errors
    ///
    /// Returns `HtmlError` if the input nests deeper than the parser allows.
    pub fn create_fragment(&mut self, input: &str) -> Result<Vec<NodeId>, HtmlError> {
        let fragment = html::parse_fragment(self, input, &HtmlParseOptions::default())?;
        Ok(self.children(fragment).collect())
    }

    /// Returns the document node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the first element child of the document node.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.element_children(self.root).next()
    }

    /// Returns a reference to the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a valid node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns the coarse type of a node.
    #[must_use]
    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.node(id).kind.node_type()
    }

    /// Returns `true` if the node is an element.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element { .. })
    }

    /// Returns the lowercased tag name of an element.
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the text of a text or comment node.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content } | NodeKind::Comment { content } => Some(content),
            _ => None,
        }
    }

    /// Returns the concatenated text content of a node and all its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeKind::Text { content } = &self.node(id).kind {
            return content.clone();
        }
        let mut result = String::new();
        for node in self.descendants(id) {
            if let NodeKind::Text { content } = &self.node(node).kind {
                result.push_str(content);
            }
        }
        result
    }

    /// Returns the attributes of an element node.
    ///
    /// Returns an empty slice for non-element nodes.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the value of an attribute. `name` must be lowercase.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns the element's `id` attribute, if present and non-empty.
    #[must_use]
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.attribute(id, "id").filter(|v| !v.is_empty())
    }

    /// Returns an iterator over the element's class names.
    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attribute(id, "class")
            .unwrap_or("")
            .split(is_html_whitespace)
            .filter(|c| !c.is_empty())
    }

    /// Returns `true` if the element's class list contains `class` exactly.
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    /// The document's name tokenizer.
    #[must_use]
    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns the next sibling that is an element.
    #[must_use]
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(node) = current {
            if self.is_element(node) {
                return Some(node);
            }
            current = self.next_sibling(node);
        }
        None
    }

    /// Returns the previous sibling that is an element.
    #[must_use]
    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_sibling(id);
        while let Some(node) = current {
            if self.is_element(node) {
                return Some(node);
            }
            current = self.prev_sibling(node);
        }
        None
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over the element children of a node.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(|&c| self.is_element(c))
    }

    /// Returns an iterator over a node and its ancestors (walking up to root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Returns `true` if the node has the document node as an ancestor
    /// (or is the document node).
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.ancestors(id).last() == Some(self.root)
    }

    /// Computes the node's structural path.
    #[must_use]
    pub fn node_path(&self, id: NodeId) -> NodePath {
        let mut components = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            components.push(self.node(current).position);
            current = parent;
        }
        components.push(current.into_raw());
        components.reverse();
        NodePath::from_components(components)
    }

    /// Returns the index keys an element contributes: tag, id, one per
    /// class, and one per attribute name. Non-elements have none.
    #[must_use]
    pub fn index_keys(&self, id: NodeId) -> Vec<IndexKey> {
        let NodeKind::Element { name, attributes } = &self.node(id).kind else {
            return Vec::new();
        };
        let mut keys = Vec::with_capacity(attributes.len() + 2);
        let mut push = |marker, text: &str| {
            if let Some(token) = self.tokens.get(text) {
                keys.push(IndexKey::new(marker, token));
            }
        };
        push(KeyMarker::Tag, name);
        if let Some(value) = self.element_id(id) {
            push(KeyMarker::Id, value);
        }
        for class in self.classes(id) {
            push(KeyMarker::Class, class);
        }
        for attribute in attributes {
            push(KeyMarker::Attribute, &attribute.name);
        }
        keys.sort();
        keys.dedup();
        keys
    }

    // --- Construction ---

    fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Creates a detached element. The name is lowercased.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_element_with_attributes(name, Vec::new())
    }

    /// Creates a detached element with the given attributes.
    ///
    /// Later duplicates of an attribute name are dropped.
    pub fn create_element_with_attributes(
        &mut self,
        name: &str,
        attributes: Vec<Attribute>,
    ) -> NodeId {
        let name = name.to_ascii_lowercase();
        self.tokens.intern(&name);
        let mut unique: Vec<Attribute> = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            if unique.iter().all(|a| a.name != attribute.name) {
                self.intern_attribute(&attribute);
                unique.push(attribute);
            }
        }
        self.create_node(NodeKind::Element {
            name,
            attributes: unique,
        })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Text {
            content: content.into(),
        })
    }

    /// Creates a detached comment node.
    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Comment {
            content: content.into(),
        })
    }

    /// Creates an empty fragment container.
    pub fn create_fragment_node(&mut self) -> NodeId {
        self.create_node(NodeKind::Fragment)
    }

    fn intern_attribute(&mut self, attribute: &Attribute) {
        self.tokens.intern(&attribute.name);
        match attribute.name.as_str() {
            "id" if !attribute.value.is_empty() => {
                self.tokens.intern(&attribute.value);
            }
            "class" => {
                for class in attribute
                    .value
                    .split(is_html_whitespace)
                    .filter(|c| !c.is_empty())
                {
                    self.tokens.intern(class);
                }
            }
            _ => {}
        }
    }

    // --- Mutation ---

    /// Appends a child node to the end of a parent's child list.
    ///
    /// A child that is already attached elsewhere is detached first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(child).parent.is_some() {
            self.detach(child);
        }

        self.node_mut(child).parent = Some(parent);
        if let Some(last) = self.node(parent).last_child {
            let position = self.node(last).position + 1;
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(child).position = position;
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(child).position = 0;
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }

        if self.is_connected(child) {
            self.with_index(|index, doc| index.add_node(doc, child));
        }
    }

    /// Inserts `new_child` before `reference` in the parent's child list.
    ///
    /// A `new_child` that is already attached elsewhere is detached first.
    /// Does nothing if `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, new_child: NodeId) {
        let Some(parent) = self.node(reference).parent else {
            return;
        };
        if self.node(new_child).parent.is_some() {
            self.detach(new_child);
        }
        // Detaching may have shifted the reference's position.
        let connected = self.is_connected(parent);
        let shifted: Vec<NodeId> = self.siblings_from(reference).collect();
        if connected {
            self.with_index(|index, doc| {
                for &node in &shifted {
                    index.remove_node(doc, node);
                }
            });
        }

        self.node_mut(new_child).parent = Some(parent);
        self.node_mut(new_child).position = self.node(reference).position;
        if let Some(prev) = self.node(reference).prev_sibling {
            self.node_mut(prev).next_sibling = Some(new_child);
            self.node_mut(new_child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(new_child);
        }
        self.node_mut(new_child).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(new_child);
        for &node in &shifted {
            self.node_mut(node).position += 1;
        }

        if connected {
            self.with_index(|index, doc| {
                index.add_node(doc, new_child);
                for &node in &shifted {
                    index.add_node(doc, node);
                }
            });
        }
    }

    /// Prepends a child node as the first child of a parent.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(first) = self.first_child(parent) {
            self.insert_before(first, child);
        } else {
            self.append_child(parent, child);
        }
    }

    /// Detaches a node from its parent (but does not free it from the arena).
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let connected = self.is_connected(parent);
        let shifted: Vec<NodeId> = self.siblings_from(id).skip(1).collect();
        if connected {
            self.with_index(|index, doc| {
                index.remove_node(doc, id);
                for &node in &shifted {
                    index.remove_node(doc, node);
                }
            });
        }

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;
        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }
        let node = self.node_mut(id);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        node.position = 0;
        for &node in &shifted {
            self.node_mut(node).position -= 1;
        }

        if connected {
            self.with_index(|index, doc| {
                for &node in &shifted {
                    index.add_node(doc, node);
                }
            });
        }
    }

    /// Sets an attribute on an element, replacing any existing value.
    ///
    /// Does nothing if `id` is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if !self.is_element(id) {
            return;
        }
        let attribute = Attribute::new(name, value);
        self.intern_attribute(&attribute);
        self.update_element_keys(id, move |attributes| {
            if let Some(existing) = attributes.iter_mut().find(|a| a.name == attribute.name) {
                existing.value = attribute.value;
            } else {
                attributes.push(attribute);
            }
        });
    }

    /// Removes an attribute from an element, if present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        if self.attribute(id, &name).is_none() {
            return;
        }
        self.update_element_keys(id, |attributes| attributes.retain(|a| a.name != name));
    }

    /// Mutates an element's attributes, re-indexing its own keys.
    fn update_element_keys(&mut self, id: NodeId, mutate: impl FnOnce(&mut Vec<Attribute>)) {
        let connected = self.is_connected(id);
        let path = self.node_path(id);
        if connected {
            for key in &self.index_keys(id) {
                self.index.remove(key, id, &path);
            }
        }
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind {
            mutate(attributes);
        }
        if connected {
            let keys = self.index_keys(id);
            for key in keys {
                self.index.add(key, id, &path);
            }
        }
    }

    /// `node` and its following siblings, in order.
    fn siblings_from(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node), |&n| self.next_sibling(n))
    }

    /// Runs `f` with the index detached from `self`, so it can read the tree.
    fn with_index(&mut self, f: impl FnOnce(&mut dyn DomIndex, &Document)) {
        if self.index.kind() == IndexKind::None {
            return;
        }
        let mut index = std::mem::replace(&mut self.index, Box::new(NoIndex::new()));
        f(index.as_mut(), self);
        self.index = index;
    }

    /// Returns the total number of nodes in the arena (including placeholder).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1 // subtract placeholder at index 0
    }

    // --- Index management ---

    /// The document's index.
    #[must_use]
    pub fn index(&self) -> &dyn DomIndex {
        self.index.as_ref()
    }

    /// Which index implementation this document maintains.
    #[must_use]
    pub fn index_kind(&self) -> IndexKind {
        self.index.kind()
    }

    /// Replaces the index implementation and rebuilds it from the tree.
    pub fn set_index_kind(&mut self, kind: IndexKind) {
        let queue = self.index.queues_changes();
        self.index = kind.create(queue);
        debug!(index = %kind, "switched document index");
        self.rebuild_index();
    }

    /// Enables or disables batching of index mutations.
    pub fn set_queue_changes(&mut self, queue: bool) {
        self.index.set_queue_changes(queue);
    }

    /// Applies queued index changes, returning how many were applied.
    pub fn flush_index(&mut self) -> usize {
        self.index.flush()
    }

    /// Number of queued index changes.
    #[must_use]
    pub fn pending_index_changes(&self) -> usize {
        self.index.pending()
    }

    /// Flushes the index and returns its entry count.
    pub fn index_len(&mut self) -> usize {
        self.index.flush();
        self.index.len()
    }

    /// Clears the index and re-adds every connected element.
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        let root = self.root;
        self.with_index(|index, doc| index.add_node(doc, root));
        let applied = self.index.flush();
        debug!(
            index = %self.index.kind(),
            applied,
            entries = self.index.len(),
            "rebuilt document index"
        );
    }

    // --- Querying ---

    /// Selects every node matching `selector` in the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector does not parse.
    pub fn select(&mut self, selector: &str) -> Result<Vec<NodeId>> {
        Selector::parse(selector)?.select(self, None)
    }

    /// Selects descendants of `context` matching `selector`, like jQuery's
    /// `find`. The context nodes themselves are never returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector does not parse.
    pub fn find(&mut self, context: &[NodeId], selector: &str) -> Result<Vec<NodeId>> {
        Selector::parse(selector)?
            .to_context_selector()
            .select(self, Some(context))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexSource for Document {
    fn index_keys(&self, node: NodeId) -> Vec<IndexKey> {
        Document::index_keys(self, node)
    }

    fn node_path(&self, node: NodeId) -> NodePath {
        Document::node_path(self, node)
    }

    fn indexable_children(&self, node: NodeId) -> Vec<NodeId> {
        self.element_children(node).collect()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        // Try to go deeper first
        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        // Try next sibling
        if let Some(sibling) = self.doc.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        // Walk up to find an ancestor with a next sibling
        let mut ancestor = self.doc.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                self.next = None;
                return Some(current);
            }
            if let Some(sibling) = self.doc.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.doc.parent(anc);
        }

        self.next = None;
        Some(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(doc: &mut Document, parent: NodeId, name: &str) -> NodeId {
        let el = doc.create_element(name);
        doc.append_child(parent, el);
        el
    }

    #[test]
    fn test_new_document_has_root() {
        let doc = Document::new();
        assert!(matches!(doc.node(doc.root()).kind, NodeKind::Document));
        assert_eq!(doc.node_count(), 1);
        assert!(doc.is_connected(doc.root()));
    }

    #[test]
    fn test_create_and_append_element() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = element(&mut doc, root, "DIV");
        assert_eq!(doc.tag_name(div), Some("div"));
        assert_eq!(doc.parent(div), Some(root));
        assert_eq!(doc.root_element(), Some(div));
    }

    #[test]
    fn test_positions_track_insert_and_detach() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = element(&mut doc, root, "a");
        let c = element(&mut doc, root, "c");
        let b = doc.create_element("b");
        doc.insert_before(c, b);
        assert_eq!(
            [a, b, c].map(|n| doc.node(n).position),
            [0, 1, 2]
        );

        doc.detach(a);
        assert_eq!([b, c].map(|n| doc.node(n).position), [0, 1]);
        assert_eq!(doc.node(a).position, 0);
        assert!(!doc.is_connected(a));
    }

    #[test]
    fn test_node_path() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = element(&mut doc, root, "div");
        let _text = {
            let t = doc.create_text("x");
            doc.append_child(div, t);
            t
        };
        let p = element(&mut doc, div, "p");
        assert_eq!(doc.node_path(root).as_slice(), &[1]);
        assert_eq!(doc.node_path(p).as_slice(), &[1, 0, 1]);
        assert!(doc.node_path(div).is_ancestor_of(&doc.node_path(p)));
    }

    #[test]
    fn test_fragment_paths_start_at_fragment() {
        let mut doc = Document::new();
        let fragment = doc.create_fragment_node();
        let span = element(&mut doc, fragment, "span");
        assert_eq!(doc.node_path(span).as_slice(), &[fragment.into_raw(), 0]);
        assert!(!doc.is_connected(span));
    }

    #[test]
    fn test_classes_split_on_html_whitespace() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = element(&mut doc, root, "div");
        doc.set_attribute(div, "CLASS", " a\tb\nc ");
        assert_eq!(doc.classes(div).collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(doc.has_class(div, "b"));
        assert!(!doc.has_class(div, "B"));
    }

    #[test]
    fn test_index_keys() {
        let mut doc = Document::new();
        let div = doc.create_element_with_attributes(
            "div",
            vec![
                Attribute::new("id", "main"),
                Attribute::new("class", "x y"),
                Attribute::new("data-k", ""),
            ],
        );
        let keys = doc.index_keys(div);
        let tokens = doc.tokens();
        let expect = |marker, name: &str| IndexKey::new(marker, tokens.get(name).unwrap());
        for key in [
            expect(KeyMarker::Tag, "div"),
            expect(KeyMarker::Id, "main"),
            expect(KeyMarker::Class, "x"),
            expect(KeyMarker::Class, "y"),
            expect(KeyMarker::Attribute, "id"),
            expect(KeyMarker::Attribute, "class"),
            expect(KeyMarker::Attribute, "data-k"),
        ] {
            assert!(keys.contains(&key), "missing {key:?}");
        }
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn test_index_follows_mutations() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = element(&mut doc, root, "div");
        let p = element(&mut doc, div, "p");
        // div: tag. p: tag.
        assert_eq!(doc.index_len(), 2);

        doc.set_attribute(p, "class", "x");
        // p gains class x and attribute class.
        assert_eq!(doc.index_len(), 4);

        doc.remove_attribute(p, "class");
        assert_eq!(doc.index_len(), 2);

        doc.detach(div);
        assert_eq!(doc.index_len(), 0);
    }

    #[test]
    fn test_insert_before_reindexes_shifted_siblings() {
        let mut doc = Document::with_options(DocumentOptions::new().queue_changes(false));
        let root = doc.root();
        let first = element(&mut doc, root, "p");
        let second = element(&mut doc, root, "p");
        let inserted = doc.create_element("p");
        doc.insert_before(first, inserted);

        let key = IndexKey::new(KeyMarker::Tag, doc.tokens().get("p").unwrap());
        assert_eq!(
            doc.index().query(&key).unwrap(),
            vec![inserted, first, second]
        );
        assert_eq!(doc.index_len(), 3);
    }

    #[test]
    fn test_fragment_nodes_are_not_indexed() {
        let mut doc = Document::new();
        let fragment = doc.create_fragment_node();
        element(&mut doc, fragment, "div");
        assert_eq!(doc.index_len(), 0);
    }

    #[test]
    fn test_rebuild_after_switching_kind() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = element(&mut doc, root, "div");
        element(&mut doc, div, "span");
        doc.set_index_kind(IndexKind::Simple);
        assert_eq!(doc.index_kind(), IndexKind::Simple);
        assert_eq!(doc.index_len(), 2);
        doc.set_index_kind(IndexKind::None);
        assert_eq!(doc.index_len(), 0);
    }

    #[test]
    fn test_queued_changes_are_reported() {
        let mut doc = Document::new();
        let root = doc.root();
        element(&mut doc, root, "div");
        assert_eq!(doc.pending_index_changes(), 1);
        assert_eq!(doc.flush_index(), 1);
        assert_eq!(doc.pending_index_changes(), 0);
    }

    #[test]
    fn test_descendants_iterator() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = element(&mut doc, root, "a");
        let b = element(&mut doc, a, "b");
        let c = element(&mut doc, a, "c");
        let d = element(&mut doc, root, "d");
        assert_eq!(doc.descendants(root).collect::<Vec<_>>(), vec![a, b, c, d]);
        assert_eq!(doc.descendants(a).collect::<Vec<_>>(), vec![b, c]);
    }

    #[test]
    fn test_element_siblings_skip_text() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = element(&mut doc, root, "a");
        let t = doc.create_text(" ");
        doc.append_child(root, t);
        let b = element(&mut doc, root, "b");
        assert_eq!(doc.next_element_sibling(a), Some(b));
        assert_eq!(doc.prev_element_sibling(b), Some(a));
        assert_eq!(doc.next_element_sibling(b), None);
    }

    #[test]
    fn test_append_moves_attached_child() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = element(&mut doc, root, "a");
        let b = element(&mut doc, root, "b");
        let c = element(&mut doc, a, "c");
        doc.append_child(b, c);
        assert_eq!(doc.parent(c), Some(b));
        assert_eq!(doc.children(a).count(), 0);
        assert_eq!(doc.index_len(), 3);
    }
}
