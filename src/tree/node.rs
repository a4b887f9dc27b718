//! Node type definitions.
//!
//! `NodeKind` carries the per-type payload of a node. Navigation links
//! (parent, children, siblings) live in `NodeData`, not here.

/// The kind of a DOM node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document node. There is exactly one per `Document`.
    Document,

    /// A detached container for parsed HTML fragments.
    ///
    /// Fragment subtrees are never connected to the document node and are
    /// therefore never indexed.
    Fragment,

    /// An element node, e.g. `<div class="x">`.
    Element {
        /// The tag name, ASCII-lowercased.
        name: String,
        /// Attributes in source order. Names are ASCII-lowercased.
        attributes: Vec<Attribute>,
    },

    /// A text node.
    Text {
        /// The decoded text content.
        content: String,
    },

    /// A comment node.
    Comment {
        /// The comment text without delimiters.
        content: String,
    },
}

impl NodeKind {
    /// Returns the coarse node type of this payload.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Document => NodeType::Document,
            Self::Fragment => NodeType::Fragment,
            Self::Element { .. } => NodeType::Element,
            Self::Text { .. } => NodeType::Text,
            Self::Comment { .. } => NodeType::Comment,
        }
    }
}

/// Coarse node classification, used wherever the payload is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// The document node.
    Document,
    /// A fragment container.
    Fragment,
    /// An element.
    Element,
    /// A text node.
    Text,
    /// A comment.
    Comment,
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name, ASCII-lowercased.
    pub name: String,
    /// The attribute value with character references decoded.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute, lowercasing its name.
    #[must_use]
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            value: value.into(),
        }
    }
}
