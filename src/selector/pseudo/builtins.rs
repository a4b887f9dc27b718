//! The pseudo-classes every registry starts with.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::Result;
use crate::selector::Selector;
use crate::tree::{Document, NodeId, NodeType};

use super::filters::Positional;
use super::{
    ElementPseudo, FilterPseudo, NthExpression, PseudoArguments, PseudoFactory, PseudoSelector,
    PseudoSelectorSet,
};

/// The built-in pseudo-classes.
///
/// Structural: `first-child`, `last-child`, `only-child`, `first-of-type`,
/// `last-of-type`, `only-of-type`, `nth-child()`, `nth-last-child()`,
/// `nth-of-type()`, `nth-last-of-type()`, `empty`, `parent`, `root`.
/// Content: `header`, `contains()`, `has()`, `not()`, `visible`, `hidden`.
/// Positional: `eq()`, `lt()`, `gt()`, `first`, `last`, `odd`, `even`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPseudoSelectors;

fn factory<F>(f: F) -> PseudoFactory
where
    F: Fn(&PseudoArguments<'_>) -> Result<PseudoSelector> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn no_args(make: fn() -> PseudoSelector) -> PseudoFactory {
    factory(move |args| {
        args.expect_none()?;
        Ok(make())
    })
}

fn nth(from: Edge, of_type: bool) -> PseudoFactory {
    factory(move |args| {
        let raw = args.expect_one()?;
        let expr = NthExpression::parse(raw)
            .ok_or_else(|| args.invalid(format!("'{raw}' is not an An+B expression")))?;
        Ok(PseudoSelector::element(Position { from, of_type, expr }))
    })
}

fn positional(make: fn(i64) -> Positional) -> PseudoFactory {
    factory(move |args| Ok(PseudoSelector::filter(make(args.expect_integer()?))))
}

impl PseudoSelectorSet for BuiltinPseudoSelectors {
    fn pseudo_selectors(&self) -> Vec<(&'static str, PseudoFactory)> {
        vec![
            ("first-child", no_args(|| Position::first(Edge::Start, false))),
            ("last-child", no_args(|| Position::first(Edge::End, false))),
            ("first-of-type", no_args(|| Position::first(Edge::Start, true))),
            ("last-of-type", no_args(|| Position::first(Edge::End, true))),
            ("only-child", no_args(|| PseudoSelector::element(Only { of_type: false }))),
            ("only-of-type", no_args(|| PseudoSelector::element(Only { of_type: true }))),
            ("nth-child", nth(Edge::Start, false)),
            ("nth-last-child", nth(Edge::End, false)),
            ("nth-of-type", nth(Edge::Start, true)),
            ("nth-last-of-type", nth(Edge::End, true)),
            ("empty", no_args(|| PseudoSelector::element(Empty { negate: false }))),
            ("parent", no_args(|| PseudoSelector::element(Empty { negate: true }))),
            ("root", no_args(|| PseudoSelector::element(Root))),
            ("header", no_args(|| PseudoSelector::element(Header))),
            ("visible", no_args(|| PseudoSelector::element(Visibility { hidden: false }))),
            ("hidden", no_args(|| PseudoSelector::element(Visibility { hidden: true }))),
            ("contains", factory(contains)),
            ("has", factory(has)),
            ("not", factory(not)),
            ("eq", positional(Positional::Eq)),
            ("lt", positional(Positional::Lt)),
            ("gt", positional(Positional::Gt)),
            ("first", no_args(|| PseudoSelector::filter(Positional::first()))),
            ("last", no_args(|| PseudoSelector::filter(Positional::last()))),
            ("odd", no_args(|| PseudoSelector::filter(Positional::Odd))),
            ("even", no_args(|| PseudoSelector::filter(Positional::Even))),
        ]
    }
}

// --- Structural ---

/// Which end of the sibling list positions count from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

/// `:nth-child` and its relatives.
#[derive(Debug, Clone, Copy)]
struct Position {
    from: Edge,
    of_type: bool,
    expr: NthExpression,
}

impl Position {
    /// Position 1 counted from `from`.
    fn first(from: Edge, of_type: bool) -> PseudoSelector {
        PseudoSelector::element(Self {
            from,
            of_type,
            expr: NthExpression::index(1),
        })
    }

    /// 1-based positions of `siblings` under this pseudo-class's counting.
    fn positions(&self, doc: &Document, siblings: &[NodeId]) -> Vec<i64> {
        let mut counts: HashMap<&str, i64> = HashMap::new();
        let mut seen = 0_i64;
        let mut number = |&node: &NodeId| {
            if self.of_type {
                let count = counts.entry(doc.tag_name(node).unwrap_or_default()).or_default();
                *count += 1;
                *count
            } else {
                seen += 1;
                seen
            }
        };
        match self.from {
            Edge::Start => siblings.iter().map(&mut number).collect(),
            Edge::End => {
                let mut out: Vec<i64> = siblings.iter().rev().map(&mut number).collect();
                out.reverse();
                out
            }
        }
    }
}

/// Element siblings of `element`, itself included. A parentless element is
/// its own only sibling.
fn element_siblings(doc: &Document, element: NodeId) -> Vec<NodeId> {
    match doc.parent(element) {
        Some(parent) => doc.element_children(parent).collect(),
        None => vec![element],
    }
}

impl ElementPseudo for Position {
    fn matches(&self, doc: &Document, element: NodeId) -> Result<bool> {
        let siblings = element_siblings(doc, element);
        let positions = self.positions(doc, &siblings);
        Ok(siblings
            .iter()
            .zip(positions)
            .any(|(&node, n)| node == element && self.expr.matches(n)))
    }

    fn matching_children(&self, doc: &Document, parent: NodeId) -> Result<Vec<NodeId>> {
        let children: Vec<NodeId> = doc.element_children(parent).collect();
        let positions = self.positions(doc, &children);
        Ok(children
            .into_iter()
            .zip(positions)
            .filter(|&(_, n)| self.expr.matches(n))
            .map(|(node, _)| node)
            .collect())
    }
}

/// `:only-child` and `:only-of-type`.
#[derive(Debug, Clone, Copy)]
struct Only {
    of_type: bool,
}

impl ElementPseudo for Only {
    fn matches(&self, doc: &Document, element: NodeId) -> Result<bool> {
        let tag = doc.tag_name(element);
        Ok(element_siblings(doc, element)
            .into_iter()
            .filter(|&node| !self.of_type || doc.tag_name(node) == tag)
            .take(2)
            .count()
            == 1)
    }
}

/// `:empty`, or `:parent` when negated.
#[derive(Debug, Clone, Copy)]
struct Empty {
    negate: bool,
}

impl ElementPseudo for Empty {
    fn matches(&self, doc: &Document, element: NodeId) -> Result<bool> {
        let empty = !doc
            .children(element)
            .any(|child| matches!(doc.node_type(child), NodeType::Element | NodeType::Text));
        Ok(empty != self.negate)
    }
}

/// `:root`: the document element.
#[derive(Debug, Clone, Copy)]
struct Root;

impl ElementPseudo for Root {
    fn matches(&self, doc: &Document, element: NodeId) -> Result<bool> {
        Ok(doc
            .parent(element)
            .is_some_and(|parent| doc.node_type(parent) == NodeType::Document))
    }
}

// --- Content ---

/// `:header`: `h1` through `h6`.
#[derive(Debug, Clone, Copy)]
struct Header;

impl ElementPseudo for Header {
    fn matches(&self, doc: &Document, element: NodeId) -> Result<bool> {
        Ok(matches!(
            doc.tag_name(element),
            Some("h1" | "h2" | "h3" | "h4" | "h5" | "h6")
        ))
    }
}

/// `:contains(text)`: the element's text content includes `text`.
#[derive(Debug, Clone)]
struct Contains {
    text: String,
}

fn strip_quotes(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    raw
}

fn contains(args: &PseudoArguments<'_>) -> Result<PseudoSelector> {
    let text = strip_quotes(args.expect_one()?).to_owned();
    Ok(PseudoSelector::element(Contains { text }))
}

impl ElementPseudo for Contains {
    fn matches(&self, doc: &Document, element: NodeId) -> Result<bool> {
        Ok(doc.text_content(element).contains(&self.text))
    }
}

/// `:has(selector)`: some descendant matches `selector`.
#[derive(Debug)]
struct Has {
    selector: Selector,
}

fn has(args: &PseudoArguments<'_>) -> Result<PseudoSelector> {
    let selector = args.expect_selector()?.to_context_selector();
    Ok(PseudoSelector::element(Has { selector }))
}

impl ElementPseudo for Has {
    fn matches(&self, doc: &Document, element: NodeId) -> Result<bool> {
        let found = self
            .selector
            .select_in(doc, Some(std::slice::from_ref(&element)))?;
        Ok(!found.is_empty())
    }
}

/// `:not(selector)`: the members of the selection that `selector` rejects.
///
/// This runs on the whole selection rather than per element so that
/// positional arguments count within it: `li:not(:first)` drops only the
/// first `li`.
#[derive(Debug)]
struct Not {
    selector: Selector,
}

fn not(args: &PseudoArguments<'_>) -> Result<PseudoSelector> {
    let selector = args.expect_selector()?;
    Ok(PseudoSelector::filter(Not { selector }))
}

impl FilterPseudo for Not {
    fn filter(&self, doc: &Document, selection: &[NodeId]) -> Result<Vec<NodeId>> {
        let excluded: HashSet<NodeId> = self
            .selector
            .filter_in(doc, selection)?
            .into_iter()
            .collect();
        Ok(selection
            .iter()
            .copied()
            .filter(|node| !excluded.contains(node))
            .collect())
    }
}

/// Elements that never render a box.
const NON_RENDERED: &[&str] = &[
    "base", "head", "link", "meta", "script", "style", "template", "title",
];

/// `:visible` and `:hidden`, judged from markup alone.
///
/// An element is hidden if it or an ancestor carries `hidden`, has an
/// inline `display: none`, is `<input type="hidden">`, or is a
/// non-rendered element.
#[derive(Debug, Clone, Copy)]
struct Visibility {
    hidden: bool,
}

fn hides_itself(doc: &Document, element: NodeId) -> bool {
    let Some(tag) = doc.tag_name(element) else {
        return false;
    };
    if NON_RENDERED.contains(&tag) || doc.attribute(element, "hidden").is_some() {
        return true;
    }
    if tag == "input"
        && doc
            .attribute(element, "type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    {
        return true;
    }
    doc.attribute(element, "style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.split(';').any(|decl| decl == "display:none")
    })
}

impl ElementPseudo for Visibility {
    fn matches(&self, doc: &Document, element: NodeId) -> Result<bool> {
        let hidden = hides_itself(doc, element)
            || doc.ancestors(element).any(|a| hides_itself(doc, a));
        Ok(hidden == self.hidden)
    }
}
