//! Set-level laws of `Selector::select`, `filter`, and `except`.
//!
//! These do not pin particular results; they check the relations that must
//! hold between operations for any selector over any document.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use pretty_assertions::assert_eq;

use selectoxide::{Document, NodeId, Selector};

const MARKUP: &str = r#"
<section id="s1" class="box">
  <h2>A</h2>
  <ul><li class="on">1</li><li>2</li><li class="on off">3</li><li>4</li><li class="on">5</li></ul>
  <p title="x">para <b>bold</b></p>
</section>
<section id="s2">
  <h2 class="on">B</h2>
  <div class="box"><p>inner</p><p class="on"></p></div>
</section>
"#;

const SELECTORS: &[&str] = &[
    "li",
    ".on",
    "section > *",
    "section p",
    "li:odd",
    "li.on:last",
    "h2 + ul li",
    ".box p:first-child",
    "li, p, h2.on",
    "p[title], b",
    ":not(li)",
    "div:has(p.on) p",
    "*:contains('B')",
];

fn doc() -> Document {
    Document::parse_html(MARKUP).unwrap()
}

fn all_elements(doc: &mut Document) -> Vec<NodeId> {
    doc.select("*").unwrap()
}

fn document_order(doc: &Document, nodes: &[NodeId]) -> bool {
    nodes
        .windows(2)
        .all(|pair| doc.node_path(pair[0]) < doc.node_path(pair[1]))
}

// ---------------------------------------------------------------------------
// select
// ---------------------------------------------------------------------------

#[test]
fn test_select_is_sorted_and_unique() {
    let mut doc = doc();
    for text in SELECTORS {
        let found = doc.select(text).unwrap();
        assert!(document_order(&doc, &found), "{text} is not in document order");
        let unique: HashSet<_> = found.iter().collect();
        assert_eq!(unique.len(), found.len(), "{text} has duplicates");
    }
}

#[test]
fn test_select_is_idempotent() {
    let mut doc = doc();
    for text in SELECTORS {
        let selector = Selector::parse(text).unwrap();
        let first = selector.select(&mut doc, None).unwrap();
        let second = selector.select(&mut doc, None).unwrap();
        assert_eq!(first, second, "{text}");
    }
}

#[test]
fn test_comma_is_union() {
    let mut doc = doc();
    let pairs = [("li.on", "h2"), ("section > ul", "p b"), ("#s2 p", "li:first-child")];
    for (left, right) in pairs {
        let mut expected = doc.select(left).unwrap();
        expected.extend(doc.select(right).unwrap());
        expected.sort_by_key(|&n| doc.node_path(n));
        expected.dedup();
        let union = doc.select(&format!("{left}, {right}")).unwrap();
        assert_eq!(union, expected, "{left}, {right}");
    }
}

// ---------------------------------------------------------------------------
// filter and except
// ---------------------------------------------------------------------------

#[test]
fn test_filter_preserves_sequence_order() {
    let mut doc = doc();
    let mut sequence = all_elements(&mut doc);
    sequence.reverse();
    for text in [".on", "li", "p[title]", "section > *"] {
        let selector = Selector::parse(text).unwrap();
        let kept = selector.filter(&mut doc, &sequence).unwrap();
        let positions: Vec<usize> = kept
            .iter()
            .map(|n| sequence.iter().position(|m| m == n).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }
}

#[test]
fn test_filter_and_except_partition_the_sequence() {
    let mut doc = doc();
    let sequence = all_elements(&mut doc);
    for text in ["li.on", ".on", "section > *", "section p", "h2 + ul li", "p, b", "li:not(.off)"] {
        let selector = Selector::parse(text).unwrap();
        let kept = selector.filter(&mut doc, &sequence).unwrap();
        let dropped = selector.except(&mut doc, &sequence).unwrap();
        assert_eq!(kept.len() + dropped.len(), sequence.len(), "{text}");
        let kept_set: HashSet<_> = kept.iter().collect();
        assert!(dropped.iter().all(|n| !kept_set.contains(n)), "{text}");
    }
}

#[test]
fn test_filter_of_whole_document_equals_select() {
    let mut doc = doc();
    let sequence = all_elements(&mut doc);
    for text in ["li.on", "section p", "h2 ~ *", "ul > li + li", "div p, h2"] {
        let selector = Selector::parse(text).unwrap();
        let filtered = selector.filter(&mut doc, &sequence).unwrap();
        let selected = selector.select(&mut doc, None).unwrap();
        assert_eq!(filtered, selected, "{text}");
    }
}

#[test]
fn test_matches_agrees_with_filter() {
    let mut doc = doc();
    let sequence = all_elements(&mut doc);
    let selector = Selector::parse("section > div p.on, li:nth-child(2n+1)").unwrap();
    let kept: HashSet<_> = selector.filter(&mut doc, &sequence).unwrap().into_iter().collect();
    for node in sequence {
        assert_eq!(selector.matches(&mut doc, node).unwrap(), kept.contains(&node));
    }
}

#[test]
fn test_filter_of_empty_sequence_is_empty() {
    let mut doc = doc();
    let selector = Selector::parse("li").unwrap();
    assert!(selector.filter(&mut doc, &[]).unwrap().is_empty());
    assert!(selector.except(&mut doc, &[]).unwrap().is_empty());
}
