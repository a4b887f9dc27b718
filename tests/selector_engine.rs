//! End-to-end selector tests against parsed documents.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use selectoxide::selector::pseudo::{ElementPseudo, PseudoSelector};
use selectoxide::{Document, NodeId, PseudoRegistry, Selector, SelectorError};

const PAGE: &str = r#"
<html lang="en-US">
  <head><title>Shop</title><style>p { color: red }</style></head>
  <body>
    <div id="main" class="page wide">
      <h1>Products</h1>
      <ul class="items">
        <li class="item first" data-sku="a1">Apple</li>
        <li class="item" data-sku="b2">Banana</li>
        <li class="item sale" data-sku="c3">Cherry</li>
        <li class="item"></li>
      </ul>
      <form action="/buy">
        <input type="text" name="q">
        <input name="untyped">
        <input type="checkbox" name="gift" checked>
        <input type="submit" value="Buy">
        <input type="hidden" name="token">
        <select name="size"><option selected>M</option><option>L</option></select>
        <textarea name="note" disabled></textarea>
        <button>Go</button>
        <button type="reset">Clear</button>
      </form>
      <p lang="en">Colour</p>
      <p lang="english">Color</p>
      <a href="https://example.com/doc.pdf" rel="nofollow noopener">PDF</a>
    </div>
  </body>
</html>
"#;

/// Routes engine traces to the test output. Run with
/// `RUST_LOG=selectoxide=trace` to see per-clause decisions.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn page() -> Document {
    init_tracing();
    Document::parse_html(PAGE).unwrap()
}

fn texts(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
    nodes.iter().map(|&n| doc.text_content(n)).collect()
}

fn names(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
    nodes
        .iter()
        .map(|&n| {
            let tag = doc.tag_name(n).unwrap_or_default();
            match doc.attribute(n, "name") {
                Some(name) => format!("{tag}[{name}]"),
                None => tag.to_owned(),
            }
        })
        .collect()
}

fn select(doc: &mut Document, selector: &str) -> Vec<String> {
    let found = doc.select(selector).unwrap();
    texts(doc, &found)
}

// ---------------------------------------------------------------------------
// Combinators and compound selectors
// ---------------------------------------------------------------------------

#[test]
fn test_id_child_class() {
    init_tracing();
    let mut doc = Document::parse_html(r#"<div id="a"><p class="x">t</p><p>u</p></div>"#).unwrap();
    let found = doc.select("#a > p.x").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(texts(&doc, &found), vec!["t"]);
}

#[test]
fn test_descendant_and_compound() {
    let mut doc = page();
    assert_eq!(select(&mut doc, "ul.items li.sale"), vec!["Cherry"]);
    assert_eq!(select(&mut doc, "li.item.first"), vec!["Apple"]);
    assert_eq!(select(&mut doc, "div#main.page.wide > h1"), vec!["Products"]);
    assert_eq!(select(&mut doc, "#main h1"), vec!["Products"]);
}

#[test]
fn test_sibling_combinators() {
    let mut doc = page();
    assert_eq!(select(&mut doc, "li.first + li"), vec!["Banana"]);
    assert_eq!(select(&mut doc, "li.sale ~ li").len(), 1);
    assert_eq!(select(&mut doc, "h1 ~ p"), vec!["Colour", "Color"]);
    assert!(select(&mut doc, "p + h1").is_empty());
}

#[test]
fn test_universal_and_tag_case() {
    let mut doc = page();
    assert_eq!(select(&mut doc, "UL > *").len(), 4);
    assert_eq!(select(&mut doc, "Li.SALE").len(), 0);
    assert_eq!(select(&mut doc, "LI.sale"), vec!["Cherry"]);
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

#[test]
fn test_attribute_presence_and_not_equals() {
    let mut doc = Document::parse_html(r#"<div data-x="1">a</div><div>b</div><div data-x="2">c</div>"#)
        .unwrap();
    assert_eq!(select(&mut doc, "div[data-x]"), vec!["a", "c"]);
    assert_eq!(select(&mut doc, "div[data-x!=1]"), vec!["b", "c"]);
    assert_eq!(select(&mut doc, "div[data-x=]"), select(&mut doc, "div[data-x]"));
}

#[test]
fn test_attribute_operator_boundaries() {
    let mut doc = page();
    assert!(select(&mut doc, "[data-sku^=\"\"]").is_empty());
    assert!(select(&mut doc, "[data-sku$='']").is_empty());
    assert_eq!(select(&mut doc, "p[lang|=en]"), vec!["Colour"]);
    assert_eq!(select(&mut doc, "[lang|=en]").len(), 2);
    assert_eq!(select(&mut doc, "a[rel~=noopener]"), vec!["PDF"]);
    assert!(select(&mut doc, "a[rel~=noop]").is_empty());
    assert_eq!(select(&mut doc, "a[href$=\".pdf\"][href^=https]"), vec!["PDF"]);
    assert_eq!(select(&mut doc, "li[data-sku*=2]"), vec!["Banana"]);
}

#[test]
fn test_class_word_matching() {
    let mut doc = Document::parse_html(
        r#"<i class="foo bar">1</i><i class="bar foo">2</i><i class="foobar">3</i>"#,
    )
    .unwrap();
    assert_eq!(select(&mut doc, "[class~=foo]"), vec!["1", "2"]);
    assert_eq!(select(&mut doc, ".foo"), vec!["1", "2"]);
}

// ---------------------------------------------------------------------------
// Pseudo-classes
// ---------------------------------------------------------------------------

#[test]
fn test_structural_pseudo_classes() {
    let mut doc = page();
    assert_eq!(select(&mut doc, "li:first-child"), vec!["Apple"]);
    assert_eq!(select(&mut doc, "li:nth-child(2n)"), vec!["Banana", ""]);
    assert_eq!(select(&mut doc, "ul > :nth-last-child(2)"), vec!["Cherry"]);
    assert_eq!(select(&mut doc, "li:empty").len(), 1);
    assert_eq!(select(&mut doc, "li:parent").len(), 3);
    let root = doc.select(":root").unwrap();
    assert_eq!(names(&doc, &root), vec!["html"]);
    assert_eq!(select(&mut doc, ":header"), vec!["Products"]);
}

#[test]
fn test_positional_pseudo_classes() {
    let mut doc = page();
    assert_eq!(select(&mut doc, "li:eq(1)"), vec!["Banana"]);
    assert_eq!(select(&mut doc, "li:eq(-1)"), vec![""]);
    assert_eq!(select(&mut doc, "li:first"), vec!["Apple"]);
    assert_eq!(select(&mut doc, "li:last"), vec![""]);
    assert_eq!(select(&mut doc, "li:lt(2)"), vec!["Apple", "Banana"]);
    assert_eq!(select(&mut doc, "li:gt(1)").len(), 2);
    assert_eq!(select(&mut doc, "li:odd"), vec!["Banana", ""]);
    assert_eq!(select(&mut doc, "li:even"), vec!["Apple", "Cherry"]);
}

#[test]
fn test_content_pseudo_classes() {
    let mut doc = page();
    assert_eq!(select(&mut doc, "li:contains('an')"), vec!["Banana"]);
    assert_eq!(select(&mut doc, "ul:has(li.sale)").len(), 1);
    assert_eq!(select(&mut doc, "div:has(> h1)").len(), 1);
    assert!(select(&mut doc, "ul:has(> h1)").is_empty());
    assert_eq!(select(&mut doc, "li:not(.item)").len(), 0);
    assert_eq!(select(&mut doc, "li.item:not(:first-child):not(:empty)"), vec!["Banana", "Cherry"]);
}

#[test]
fn test_visibility() {
    let mut doc = page();
    let hidden = doc.select("form :hidden").unwrap();
    assert_eq!(names(&doc, &hidden), vec!["input[token]"]);
    assert!(select(&mut doc, "title:visible").is_empty());
}

#[test]
fn test_jquery_form_extensions() {
    let mut doc = page();
    let found = doc.select("form :input").unwrap();
    assert_eq!(found.len(), 9);
    let text = doc.select(":text").unwrap();
    assert_eq!(names(&doc, &text), vec!["input[q]", "input[untyped]"]);
    let checkbox = doc.select(":checkbox:checked").unwrap();
    assert_eq!(names(&doc, &checkbox), vec!["input[gift]"]);
    let submit = doc.select(":submit").unwrap();
    assert_eq!(submit.len(), 1);
    let reset = doc.select(":reset").unwrap();
    assert_eq!(texts(&doc, &reset), vec!["Clear"]);
    assert_eq!(doc.select(":button").unwrap().len(), 2);
    assert_eq!(doc.select("option:selected").unwrap().len(), 1);
    let disabled = doc.select(":disabled").unwrap();
    assert_eq!(names(&doc, &disabled), vec!["textarea[note]"]);
    assert_eq!(doc.select("input:enabled").unwrap().len(), 5);
    assert_eq!(doc.select(":input:first").unwrap().len(), 1);
}

#[test]
fn test_custom_pseudo_class() {
    struct HasSku;

    impl ElementPseudo for HasSku {
        fn matches(&self, doc: &Document, element: NodeId) -> selectoxide::Result<bool> {
            Ok(doc.attribute(element, "data-sku").is_some())
        }
    }

    let registry = PseudoRegistry::with_builtins();
    registry.register("sku", |args| {
        args.expect_none()?;
        Ok(PseudoSelector::element(HasSku))
    });
    let mut doc = page();
    let selector = Selector::parse_with("li:sku:last", &registry).unwrap();
    let found = selector.select(&mut doc, None).unwrap();
    assert_eq!(texts(&doc, &found), vec!["Cherry"]);
    assert!(matches!(
        Selector::parse("li:sku"),
        Err(SelectorError::UnknownPseudoSelector { .. })
    ));
}

// ---------------------------------------------------------------------------
// Groups, contexts, filters
// ---------------------------------------------------------------------------

#[test]
fn test_groups_are_unions_in_document_order() {
    let mut doc = page();
    let union = doc.select("p, h1, li.first").unwrap();
    assert_eq!(texts(&doc, &union), vec!["Products", "Apple", "Colour", "Color"]);
}

#[test]
fn test_find_searches_below_context() {
    let mut doc = page();
    let lists = doc.select("ul").unwrap();
    assert_eq!(doc.find(&lists, "li").unwrap().len(), 4);
    assert!(doc.find(&lists, "ul").unwrap().is_empty());
    let direct = doc.find(&lists, "> .sale").unwrap();
    assert_eq!(texts(&doc, &direct), vec!["Cherry"]);
}

#[test]
fn test_filter_positional_uses_sequence_order() {
    let mut doc = page();
    let items = doc.select("li").unwrap();
    let sequence = vec![items[2], items[0], items[1]];
    let found = Selector::parse(":eq(1)").unwrap().filter(&mut doc, &sequence).unwrap();
    assert_eq!(found, vec![items[0]]);
}

#[test]
fn test_select_is_idempotent() {
    let mut doc = page();
    let first = doc.select("div li:not(.sale), p").unwrap();
    let second = doc.select("div li:not(.sale), p").unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Mutation and HTML selectors
// ---------------------------------------------------------------------------

#[test]
fn test_queries_see_mutations() {
    let mut doc = page();
    let list = doc.select("ul.items").unwrap()[0];
    let li = doc.create_element("li");
    let text = doc.create_text("Date");
    doc.append_child(li, text);
    doc.set_attribute(li, "class", "item sale");
    doc.prepend_child(list, li);
    assert_eq!(select(&mut doc, "li.sale"), vec!["Date", "Cherry"]);
    assert_eq!(select(&mut doc, "li:first-child"), vec!["Date"]);

    doc.remove_attribute(li, "class");
    assert_eq!(select(&mut doc, ".sale"), vec!["Cherry"]);
    doc.detach(li);
    assert_eq!(select(&mut doc, "li:first"), vec!["Apple"]);
}

#[test]
fn test_html_selector_builds_fragment() {
    let mut doc = page();
    let nodes = Selector::parse("<li class='item'>Fig</li>")
        .unwrap()
        .select(&mut doc, None)
        .unwrap();
    assert_eq!(nodes.len(), 1);
    assert!(!doc.is_connected(nodes[0]));
    assert_eq!(select(&mut doc, "li.item").len(), 4);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn test_unterminated_attribute_is_a_syntax_error() {
    let mut doc = page();
    match doc.select("[foo=") {
        Err(SelectorError::Syntax(err)) => {
            assert_eq!(err.position, 5);
            assert!(err.to_string().contains("position 5"));
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn test_unsupported_pseudo_classes() {
    let mut doc = page();
    assert!(matches!(doc.select("a:hover"), Err(SelectorError::NotImplemented { .. })));
    assert!(matches!(doc.select("p::first-line"), Err(SelectorError::NotImplemented { .. })));
    assert!(matches!(
        doc.select("li:nth-child(x)"),
        Err(SelectorError::InvalidArguments { .. })
    ));
}

#[test]
fn test_not_counts_positions_across_the_selection() {
    let mut doc = Document::parse_html("<ul><li>a</li><li>b</li><li>c</li></ul>").unwrap();
    assert_eq!(select(&mut doc, "li:not(:first)"), vec!["b", "c"]);
    assert_eq!(select(&mut doc, "li:not(:eq(1))"), vec!["a", "c"]);
    assert_eq!(select(&mut doc, "li:not(:last):not(:first)"), vec!["b"]);
}

#[test]
fn test_nested_selectors_reject_html() {
    let mut doc = page();
    for selector in ["p:not(<b>)", "p:has(<b>)"] {
        assert!(
            matches!(doc.select(selector), Err(SelectorError::InvalidArguments { .. })),
            "{selector} should be rejected"
        );
    }
}

#[test]
fn test_nth_child_with_extreme_offset() {
    let mut doc = Document::parse_html("<ul><li>a</li><li>b</li><li>c</li></ul>").unwrap();
    assert_eq!(
        select(&mut doc, "li:nth-child(n-9223372036854775808)"),
        vec!["a", "b", "c"]
    );
    assert_eq!(select(&mut doc, "li:nth-child(-n+9223372036854775807)").len(), 3);
}

#[test]
fn test_jquery_extension_display_reparses() {
    let mut doc = page();
    let selector = Selector::parse("form :input").unwrap();
    assert_eq!(selector.to_string(), "form :input");
    let expected = selector.select(&mut doc, None).unwrap();
    let reparsed = Selector::parse(&selector.to_string()).unwrap();
    assert_eq!(reparsed.select(&mut doc, None).unwrap(), expected);
}
