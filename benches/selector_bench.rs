#![allow(clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use selectoxide::{Document, DocumentOptions, IndexKind, Selector};
use std::fmt::Write;

// ---------------------------------------------------------------------------
// Document generators
// ---------------------------------------------------------------------------

/// Generates a listing page with `sections` sections of 20 rows each.
fn make_listing(sections: usize) -> String {
    let mut html = String::from("<div id=\"app\" class=\"shell\">\n");
    for s in 0..sections {
        let _ = writeln!(html, "<section id=\"s{s}\" class=\"group\"><h2>Section {s}</h2><ul>");
        for r in 0..20 {
            let class = if r % 3 == 0 { "row hot" } else { "row" };
            let _ = writeln!(
                html,
                "  <li class=\"{class}\" data-n=\"{r}\"><a href=\"/s{s}/r{r}\">Row {r}</a></li>"
            );
        }
        html.push_str("</ul></section>\n");
    }
    html.push_str("</div>\n");
    html
}

/// Generates a chain of nested `div`s with the given depth.
fn make_nested(depth: usize) -> String {
    let mut html = String::new();
    for i in 0..depth {
        let _ = write!(html, "<div class=\"d{}\">", i % 5);
    }
    html.push_str("<span id=\"leaf\">leaf</span>");
    for _ in 0..depth {
        html.push_str("</div>");
    }
    html
}

fn load(html: &str, kind: IndexKind) -> Document {
    let mut doc = Document::with_options(DocumentOptions::new().index(kind));
    let root = doc.root();
    doc.append_html(root, html).expect("failed to parse benchmark HTML");
    doc
}

// ---------------------------------------------------------------------------
// Parsing benchmarks
// ---------------------------------------------------------------------------

fn bench_parse_simple(c: &mut Criterion) {
    c.bench_function("selector_parse_simple", |b| {
        b.iter(|| Selector::parse(black_box("#app > section li.row")));
    });
}

fn bench_parse_complex(c: &mut Criterion) {
    c.bench_function("selector_parse_complex", |b| {
        b.iter(|| {
            Selector::parse(black_box(
                "section:has(h2) li.hot:not(:first-child) a[href^='/s1'], ul > li:nth-child(2n+1):lt(5), :input",
            ))
        });
    });
}

// ---------------------------------------------------------------------------
// Query benchmarks per index kind
// ---------------------------------------------------------------------------

fn bench_query(c: &mut Criterion, name: &str, selector: &str, html: &str) {
    let selector = Selector::parse(selector).expect("failed to parse benchmark selector");
    let mut group = c.benchmark_group(name);
    for kind in [IndexKind::None, IndexKind::Simple, IndexKind::Ranged] {
        let mut doc = load(html, kind);
        group.bench_function(kind.to_string(), |b| {
            b.iter(|| selector.select(black_box(&mut doc), None));
        });
    }
    group.finish();
}

fn bench_select_id(c: &mut Criterion) {
    bench_query(c, "select_id", "#s40", &make_listing(100));
}

fn bench_select_class(c: &mut Criterion) {
    bench_query(c, "select_class", ".hot", &make_listing(100));
}

fn bench_select_scoped_class(c: &mut Criterion) {
    bench_query(c, "select_scoped_class", "#s40 li.hot > a", &make_listing(100));
}

fn bench_select_attribute(c: &mut Criterion) {
    bench_query(c, "select_attribute", "li[data-n='7']", &make_listing(100));
}

fn bench_select_pseudo(c: &mut Criterion) {
    bench_query(c, "select_pseudo", "ul > li:nth-child(3n)", &make_listing(100));
}

fn bench_select_deep(c: &mut Criterion) {
    bench_query(c, "select_deep", ".d1 .d2 span", &make_nested(200));
}

// ---------------------------------------------------------------------------
// Mutation benchmark: edit then query
// ---------------------------------------------------------------------------

fn bench_mutate_and_select(c: &mut Criterion) {
    let html = make_listing(50);
    let mut doc = load(&html, IndexKind::Ranged);
    let target = doc.select("#s10 li").expect("query failed")[0];
    c.bench_function("mutate_and_select", |b| {
        let mut hot = false;
        b.iter(|| {
            hot = !hot;
            doc.set_attribute(target, "class", if hot { "row hot" } else { "row" });
            doc.select(black_box("#s10 .hot"))
        });
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(parsing, bench_parse_simple, bench_parse_complex);

criterion_group!(
    querying,
    bench_select_id,
    bench_select_class,
    bench_select_scoped_class,
    bench_select_attribute,
    bench_select_pseudo,
    bench_select_deep,
);

criterion_group!(mutation, bench_mutate_and_select);

criterion_main!(parsing, querying, mutation);
