//! Selector text to clause list.
//!
//! Compound selectors (`div.a#b[c]`) accumulate onto one clause as long as
//! each kind of test appears once. A second test of a kind already present
//! (`.a.b`), any test after a pseudo-class, or a tag after other tests
//! starts a new `Chained` clause with `Filter` traversal, which narrows the
//! previous clause's result in place. Combinators always start a new clause.

use tracing::trace;

use crate::error::{Result, SelectorError};
use crate::scanner::chars::{is_combinator, is_html_whitespace, is_quote, is_tag_start};
use crate::scanner::patterns::{CssClassName, CssId, HtmlAttributeName, HtmlTagName, OptionallyQuoted};
use crate::scanner::StringScanner;

use super::clause::{
    AttributeSelectorType, AttributeTest, CombinatorType, PseudoClause, SelectorClause,
    SelectorType, TraversalType,
};
use super::pseudo::PseudoRegistry;

/// Attribute operators in the order they are tried.
const OPERATORS: &[(&str, AttributeSelectorType)] = &[
    ("=", AttributeSelectorType::Equals),
    ("^=", AttributeSelectorType::StartsWith),
    ("*=", AttributeSelectorType::Contains),
    ("~=", AttributeSelectorType::ContainsWord),
    ("$=", AttributeSelectorType::EndsWith),
    ("!=", AttributeSelectorType::NotEquals),
    ("|=", AttributeSelectorType::StartsWithOrHyphen),
];

/// Pseudo-classes and pseudo-elements that need a live browser.
const NOT_IMPLEMENTED: &[&str] = &[
    "hover",
    "focus",
    "link",
    "visited",
    "active",
    "target",
    "before",
    "after",
    "first-line",
    "first-letter",
];

/// `input` types with a same-named jQuery pseudo-class.
const INPUT_TYPES: &[&str] = &["checkbox", "radio", "file", "image", "password"];

/// Parses `text` into clauses, resolving pseudo-classes through `registry`.
pub(crate) fn parse(text: &str, registry: &PseudoRegistry) -> Result<Vec<SelectorClause>> {
    Parser::new(text, registry).run()
}

/// A combinator seen but not yet attached to a clause.
#[derive(Debug, Clone, Copy)]
struct Pending {
    traversal: TraversalType,
    position: usize,
}

struct Parser<'r> {
    scanner: StringScanner,
    registry: &'r PseudoRegistry,
    clauses: Vec<SelectorClause>,
    current: Option<SelectorClause>,
    pending: Option<Pending>,
    /// Index in `clauses` where the current comma-separated group begins.
    group_start: usize,
    /// Index of the first non-whitespace character.
    first: usize,
}

impl<'r> Parser<'r> {
    fn new(text: &str, registry: &'r PseudoRegistry) -> Self {
        let mut scanner = StringScanner::new(text.trim_end()).skip_whitespace_automatically(false);
        scanner.skip_whitespace();
        let first = scanner.index();
        Self {
            scanner,
            registry,
            clauses: Vec::new(),
            current: None,
            pending: None,
            group_start: 0,
            first,
        }
    }

    fn run(mut self) -> Result<Vec<SelectorClause>> {
        if self.scanner.current() == Some('<') {
            return Ok(vec![self.html_clause()]);
        }

        while let Some(c) = self.scanner.current() {
            let position = self.scanner.index();
            match c {
                c if is_html_whitespace(c) => self.whitespace(),
                '>' | '+' | '~' => {
                    self.scanner.advance();
                    self.combinator(c, position)?;
                }
                ',' => {
                    self.scanner.advance();
                    self.end_group(position)?;
                }
                '*' => {
                    self.scanner.advance();
                    self.clause_for(SelectorType::ALL);
                }
                '.' => {
                    self.scanner.advance();
                    let class = self.scanner.expect_pattern(&CssClassName)?;
                    self.clause_for(SelectorType::CLASS).class = Some(class);
                }
                '#' => {
                    self.scanner.advance();
                    let id = self.scanner.expect_pattern(&CssId)?;
                    self.clause_for(SelectorType::ID).id = Some(id);
                }
                '[' => self.attribute()?,
                ':' => self.pseudo()?,
                '<' => {
                    return Err(self
                        .scanner
                        .error("an HTML fragment must be the whole selector")
                        .into())
                }
                c if is_tag_start(c) => {
                    let tag = self.scanner.expect_pattern(&HtmlTagName)?;
                    self.clause_for(SelectorType::TAG).tag = Some(tag.to_ascii_lowercase());
                }
                _ if position == self.first => return Ok(vec![self.html_clause()]),
                c => {
                    return Err(self
                        .scanner
                        .error(format!("unexpected character '{c}'"))
                        .into())
                }
            }
        }
        self.finish()
    }

    /// Treats the rest of the input as markup.
    fn html_clause(&self) -> SelectorClause {
        let mut clause = SelectorClause::new(CombinatorType::Root, TraversalType::Filter);
        clause.selector_type = SelectorType::HTML;
        clause.html = Some(self.scanner.remainder());
        clause
    }

    /// Returns `true` once anything in the current group has been parsed.
    fn has_preceding(&self) -> bool {
        self.current.is_some() || self.clauses.len() > self.group_start
    }

    /// Whitespace is a descendant combinator only between two selectors.
    fn whitespace(&mut self) {
        let position = self.scanner.index();
        self.scanner.skip_whitespace();
        let next = self.scanner.current();
        let before_separator = next.map_or(true, |c| is_combinator(c) || c == ',');
        if self.has_preceding() && self.pending.is_none() && !before_separator {
            self.pending = Some(Pending {
                traversal: TraversalType::Descendant,
                position,
            });
        }
    }

    fn combinator(&mut self, c: char, position: usize) -> Result<()> {
        if self.pending.is_some() {
            return Err(self
                .scanner
                .error_at(format!("unexpected combinator '{c}'"), position)
                .into());
        }
        let traversal = match c {
            '>' => TraversalType::Child,
            '+' => TraversalType::Adjacent,
            _ => TraversalType::Sibling,
        };
        self.pending = Some(Pending {
            traversal,
            position,
        });
        Ok(())
    }

    fn end_group(&mut self, position: usize) -> Result<()> {
        self.check_no_pending()?;
        self.finalize();
        if self.clauses.len() == self.group_start {
            return Err(self
                .scanner
                .error_at("expected a selector before ','", position)
                .into());
        }
        self.group_start = self.clauses.len();
        Ok(())
    }

    fn check_no_pending(&self) -> Result<()> {
        match self.pending {
            Some(pending) => Err(self
                .scanner
                .error_at("expected a selector after combinator", pending.position)
                .into()),
            None => Ok(()),
        }
    }

    fn finish(mut self) -> Result<Vec<SelectorClause>> {
        self.check_no_pending()?;
        self.finalize();
        if self.clauses.is_empty() {
            let mut none = SelectorClause::new(CombinatorType::Root, TraversalType::Filter);
            none.selector_type = SelectorType::NONE;
            return Ok(vec![none]);
        }
        if self.clauses.len() == self.group_start {
            return Err(self
                .scanner
                .error("expected a selector after ','")
                .into());
        }
        trace!(clauses = self.clauses.len(), "parsed selector");
        Ok(self.clauses)
    }

    fn finalize(&mut self) {
        if let Some(clause) = self.current.take() {
            self.clauses.push(clause);
        }
    }

    /// Combinator and traversal for a clause about to be opened.
    fn next_relation(&mut self) -> (CombinatorType, TraversalType) {
        let at_group_start = self.clauses.len() == self.group_start;
        match (self.pending.take(), at_group_start) {
            (None, true) => (CombinatorType::Root, TraversalType::All),
            (Some(pending), true) => (CombinatorType::Root, pending.traversal),
            (Some(pending), false) => (CombinatorType::Chained, pending.traversal),
            (None, false) => (CombinatorType::Chained, TraversalType::Filter),
        }
    }

    /// Returns the clause that receives a test of kind `slot`, opening a new
    /// one when the current clause cannot take it.
    fn clause_for(&mut self, slot: SelectorType) -> &mut SelectorClause {
        let start_new = match &self.current {
            None => true,
            Some(current) => {
                let ty = current.selector_type;
                self.pending.is_some()
                    || ty.intersects(slot)
                    || ty.contains(SelectorType::PSEUDO_CLASS)
                    || (slot.intersects(SelectorType::TAG | SelectorType::ALL) && current.is_complete())
            }
        };
        if start_new {
            self.finalize();
            let (combinator, traversal) = self.next_relation();
            self.current = Some(SelectorClause::new(combinator, traversal));
        }
        let clause = self.current.get_or_insert_with(SelectorClause::default);
        clause.selector_type |= slot;
        clause
    }

    fn attribute(&mut self) -> Result<()> {
        self.scanner.expect("[")?;
        self.scanner.skip_whitespace();
        let name = self.scanner.expect_pattern(&HtmlAttributeName)?;
        self.scanner.skip_whitespace();

        let test = if self.scanner.try_expect("]") {
            AttributeTest::new(&name, AttributeSelectorType::Exists, "")
        } else {
            let literals: Vec<&str> = OPERATORS.iter().map(|(text, _)| *text).collect();
            let operator = OPERATORS[self.scanner.expect_one_of(&literals)?].1;
            self.scanner.skip_whitespace();
            let quoted = self.scanner.current().is_some_and(is_quote);
            let value = self
                .scanner
                .expect_pattern(&OptionallyQuoted::new(&[']']))?;
            self.scanner.skip_whitespace();
            self.scanner.expect("]")?;
            attribute_test(&name, operator, value, quoted)
        };
        self.clause_for(SelectorType::ATTRIBUTE_VALUE).attribute = Some(test);
        Ok(())
    }

    fn pseudo(&mut self) -> Result<()> {
        let position = self.scanner.index();
        self.scanner.expect(":")?;
        if self.scanner.try_expect(":") {
            let name = self.scanner.try_pattern(&CssClassName).unwrap_or_default();
            return Err(SelectorError::NotImplemented {
                feature: format!("::{name}"),
                position,
            });
        }
        let name = self.scanner.expect_pattern(&CssClassName)?.to_ascii_lowercase();
        let arguments = if self.scanner.current() == Some('(') {
            Some(self.scanner.get_bounded_by('(', true)?.trim().to_owned())
        } else {
            None
        };

        if NOT_IMPLEMENTED.contains(&name.as_str()) {
            return Err(SelectorError::NotImplemented {
                feature: format!(":{name}"),
                position,
            });
        }
        if self.jquery_extension(&name, arguments.is_some())? {
            return Ok(());
        }

        let selector = self
            .registry
            .try_get_instance(&name, arguments.as_deref())?
            .ok_or_else(|| SelectorError::UnknownPseudoSelector {
                name: name.clone(),
                position,
            })?;
        self.clause_for(SelectorType::PSEUDO_CLASS).pseudo = Some(PseudoClause {
            name,
            arguments,
            selector,
        });
        Ok(())
    }

    /// Rewrites jQuery form pseudo-classes into ordinary clauses. Returns
    /// `false` if `name` is not one of them.
    fn jquery_extension(&mut self, name: &str, has_arguments: bool) -> Result<bool> {
        use AttributeSelectorType as Op;

        let typed_input = |ty: &str| tag_with("input", AttributeTest::new("type", Op::Equals, ty));
        let alternatives: Vec<SelectorClause> = match name {
            "checked" | "selected" | "disabled" => {
                self.reject_arguments(name, has_arguments)?;
                self.clause_for(SelectorType::ATTRIBUTE_VALUE).attribute =
                    Some(AttributeTest::new(name, Op::Exists, ""));
                return Ok(true);
            }
            "enabled" => {
                self.reject_arguments(name, has_arguments)?;
                self.clause_for(SelectorType::ATTRIBUTE_VALUE).attribute =
                    Some(AttributeTest::new("disabled", Op::NotExists, ""));
                return Ok(true);
            }
            "input" => ["input", "textarea", "select", "button"]
                .into_iter()
                .map(tag)
                .collect(),
            "text" => vec![
                typed_input("text"),
                tag_with("input", AttributeTest::new("type", Op::NotExists, "")),
            ],
            "button" => vec![typed_input("button"), tag("button")],
            "reset" | "submit" => vec![
                typed_input(name),
                tag_with("button", AttributeTest::new("type", Op::Equals, name)),
            ],
            _ if INPUT_TYPES.contains(&name) => vec![typed_input(name)],
            _ => return Ok(false),
        };
        self.reject_arguments(name, has_arguments)?;
        self.push_alternatives(name, alternatives);
        Ok(true)
    }

    fn reject_arguments(&self, name: &str, has_arguments: bool) -> Result<()> {
        if has_arguments {
            return Err(SelectorError::InvalidArguments {
                name: name.to_owned(),
                message: "takes no arguments".to_owned(),
            });
        }
        Ok(())
    }

    /// Appends an OR of `alternatives` as one step of the chain. The first
    /// alternative takes the pending relation; the rest are `Grouped` with
    /// it so they read from the same source.
    fn push_alternatives(&mut self, name: &str, alternatives: Vec<SelectorClause>) {
        self.finalize();
        let (combinator, traversal) = self.next_relation();
        let child_depth = usize::from(traversal == TraversalType::Child);
        for (i, mut clause) in alternatives.into_iter().enumerate() {
            clause.combinator = if i == 0 {
                combinator
            } else {
                CombinatorType::Grouped
            };
            clause.traversal = traversal;
            clause.child_depth = child_depth;
            clause.expanded_from = Some(name.to_owned());
            self.clauses.push(clause);
        }
    }
}

/// Builds the attribute test for `[name op value]`.
///
/// A bare `[a=]` is the same as `[a]`. An empty operand for `^=`, `*=` or
/// `$=` becomes `"\0"` so the test can never match.
fn attribute_test(
    name: &str,
    operator: AttributeSelectorType,
    value: String,
    quoted: bool,
) -> AttributeTest {
    use AttributeSelectorType as Op;

    if !value.is_empty() {
        return AttributeTest::new(name, operator, value);
    }
    match operator {
        Op::Equals if !quoted => AttributeTest::new(name, Op::Exists, ""),
        Op::StartsWith | Op::Contains | Op::EndsWith => AttributeTest::new(name, operator, "\0"),
        _ => AttributeTest::new(name, operator, value),
    }
}

fn tag(name: &str) -> SelectorClause {
    SelectorClause {
        selector_type: SelectorType::TAG,
        tag: Some(name.to_owned()),
        ..SelectorClause::default()
    }
}

fn tag_with(name: &str, test: AttributeTest) -> SelectorClause {
    SelectorClause {
        selector_type: SelectorType::TAG | SelectorType::ATTRIBUTE_VALUE,
        tag: Some(name.to_owned()),
        attribute: Some(test),
        ..SelectorClause::default()
    }
}
