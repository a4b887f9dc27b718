//! Error types for selector parsing, index access, and query execution.
//!
//! Every failure in this crate is permanent for its input: selector text
//! that does not scan cannot be partially compiled, and a query either runs
//! to completion or reports why it could not. Errors carry the 0-based
//! character position where the problem was detected together with a short
//! rendering of the surrounding input for diagnostics.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = SelectorError> = std::result::Result<T, E>;

/// Number of characters shown on either side of a failure position.
const CONTEXT_RADIUS: usize = 16;

/// Marker inserted into the rendered context at the failure position.
const CONTEXT_MARKER: &str = "<<HERE>>";

/// A lexical failure reported by the string scanner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("selector syntax error at position {position}: {message} in \"{context}\"")]
pub struct ScanError {
    /// Human-readable description of what was expected.
    pub message: String,
    /// 0-based character offset into the scanned text.
    pub position: usize,
    /// The input around `position`, with the failure point marked.
    pub context: String,
}

impl ScanError {
    /// Creates an error at `position` within `source`, rendering the context.
    #[must_use]
    pub fn new(message: impl Into<String>, source: &[char], position: usize) -> Self {
        Self {
            message: message.into(),
            position,
            context: render_context(source, position),
        }
    }
}

/// Renders the characters around `position` with a marker at the failure
/// point, eliding anything further than [`CONTEXT_RADIUS`] away.
fn render_context(source: &[char], position: usize) -> String {
    let position = position.min(source.len());
    let start = position.saturating_sub(CONTEXT_RADIUS);
    let end = (position + CONTEXT_RADIUS).min(source.len());

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.extend(&source[start..position]);
    out.push_str(CONTEXT_MARKER);
    out.extend(&source[position..end]);
    if end < source.len() {
        out.push_str("...");
    }
    out
}

/// A failure raised by a [`DomIndex`](crate::index::DomIndex) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The operation needs a capability this index does not have.
    #[error("{operation} is not supported by the {index} index")]
    Unsupported {
        /// The operation that was attempted.
        operation: &'static str,
        /// The index implementation that rejected it.
        index: &'static str,
    },

    /// A read was attempted while queued changes had not been flushed.
    #[error("the index has {pending} queued changes; flush it before reading")]
    PendingChanges {
        /// Number of operations still waiting in the queue.
        pending: usize,
    },
}

/// A failure raised while building nodes from HTML text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTML parse error at byte {offset}: {message}")]
pub struct HtmlError {
    /// Human-readable error message.
    pub message: String,
    /// 0-based byte offset in the HTML source.
    pub offset: usize,
}

/// The error type for selector compilation and execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// Malformed selector text.
    #[error(transparent)]
    Syntax(#[from] ScanError),

    /// Valid syntax naming a feature this engine deliberately does not support
    /// (browser state pseudo-classes, CSS pseudo-elements).
    #[error("{feature} is not implemented (at position {position})")]
    NotImplemented {
        /// The unsupported construct, as written.
        feature: String,
        /// 0-based character offset of the construct.
        position: usize,
    },

    /// A `:name` that does not resolve in the pseudo-selector registry.
    #[error("unknown pseudo-selector ':{name}' at position {position}")]
    UnknownPseudoSelector {
        /// The pseudo-selector name without the leading colon.
        name: String,
        /// 0-based character offset of the colon.
        position: usize,
    },

    /// A registered pseudo-selector rejected its arguments.
    #[error("invalid arguments for ':{name}': {message}")]
    InvalidArguments {
        /// The pseudo-selector name.
        name: String,
        /// What was wrong with the arguments.
        message: String,
    },

    /// A clause reached the engine in a state the parser never produces.
    #[error("selector engine invariant violated: {0}")]
    Invariant(String),

    /// An index operation failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// An HTML fragment selector could not be materialised.
    #[error(transparent)]
    Html(#[from] HtmlError),
}
