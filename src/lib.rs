//! # selectoxide
//!
//! A CSS and jQuery selector engine over an arena HTML DOM. Selector text
//! compiles to a clause chain that runs against a whole document or an
//! explicit set of context nodes, returning matches in document order
//! without duplicates. Documents maintain a node index (none, hashed, or
//! path-ordered) that the engine uses in place of tree walks where it can.
//!
//! ## Quick Start
//!
//! ```
//! use selectoxide::Document;
//!
//! let mut doc = Document::parse_html(
//!     r#"<div id="a"><p class="x">t</p><p>u</p></div>"#,
//! ).unwrap();
//! let hits = doc.select("#a > p.x").unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(doc.text_content(hits[0]), "t");
//! ```

pub mod error;
pub mod html;
pub mod index;
pub mod scanner;
pub mod selector;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use error::{HtmlError, IndexError, Result, ScanError, SelectorError};
pub use html::HtmlParseOptions;
pub use index::{DomIndex, IndexCapabilities, IndexKind};
pub use selector::pseudo::{PseudoRegistry, PseudoSelector};
pub use selector::Selector;
pub use tree::{Attribute, Document, DocumentOptions, NodeId};
