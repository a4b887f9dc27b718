//! Selector clauses: the parsed, structured form of one selector fragment.
//!
//! A clause carries at most one test of each kind (tag, id, class,
//! attribute, pseudo-class) plus how it relates to the clause before it
//! ([`CombinatorType`]) and to the nodes it is applied to
//! ([`TraversalType`]). Clauses are plain values: cloning a
//! [`Selector`](super::Selector) clones every clause.

use std::fmt;

use bitflags::bitflags;

use crate::tree::NodeId;

use super::pseudo::PseudoSelector;

bitflags! {
    /// Which tests a clause carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SelectorType: u16 {
        /// `*`: any element.
        const ALL = 1 << 0;
        /// Tag name test.
        const TAG = 1 << 1;
        /// Id test.
        const ID = 1 << 2;
        /// Class membership test.
        const CLASS = 1 << 3;
        /// Attribute test (any operator).
        const ATTRIBUTE_VALUE = 1 << 4;
        /// Pseudo-class.
        const PSEUDO_CLASS = 1 << 5;
        /// Membership in an explicit node list.
        const ELEMENTS = 1 << 6;
        /// The selector is an HTML fragment, not a query.
        const HTML = 1 << 7;
        /// Matches nothing.
        const NONE = 1 << 8;
    }
}

/// How a clause's result relates to the previous clause's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombinatorType {
    /// Starts a comma-separated alternative; its source is the query context.
    #[default]
    Root,
    /// Applies to the previous clause's result.
    Chained,
    /// An alternative evaluated against the same source as the previous
    /// clause, with results concatenated.
    Grouped,
    /// Applies to an externally supplied context.
    Context,
}

/// The tree relationship a clause must satisfy relative to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TraversalType {
    /// Anywhere in the source subtrees, the source nodes included.
    #[default]
    All,
    /// The source nodes themselves.
    Filter,
    /// Strict descendants of the source nodes.
    Descendant,
    /// Nodes exactly `child_depth` levels below the source nodes.
    Child,
    /// The next element sibling of each source node.
    Adjacent,
    /// Every following element sibling of each source node.
    Sibling,
}

/// Attribute test operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSelectorType {
    /// `[a]`
    Exists,
    /// The attribute is absent (`:enabled`).
    NotExists,
    /// `[a=v]`
    Equals,
    /// `[a^=v]`
    StartsWith,
    /// `[a*=v]`
    Contains,
    /// `[a~=v]`: whitespace-separated word list contains `v`.
    ContainsWord,
    /// `[a$=v]`
    EndsWith,
    /// `[a!=v]`: absent or different.
    NotEquals,
    /// `[a|=v]`: equals `v` or starts with `v-`.
    StartsWithOrHyphen,
}

impl AttributeSelectorType {
    /// The operator as written in selector text.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exists | Self::NotExists => "",
            Self::Equals => "=",
            Self::StartsWith => "^=",
            Self::Contains => "*=",
            Self::ContainsWord => "~=",
            Self::EndsWith => "$=",
            Self::NotEquals => "!=",
            Self::StartsWithOrHyphen => "|=",
        }
    }
}

/// Attributes whose values HTML treats as case-insensitive.
const CASE_INSENSITIVE_ATTRIBUTES: &[&str] = &[
    "align",
    "charset",
    "checked",
    "dir",
    "disabled",
    "http-equiv",
    "lang",
    "media",
    "method",
    "multiple",
    "nowrap",
    "readonly",
    "scope",
    "selected",
    "shape",
    "valign",
];

/// How attribute values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StringComparison {
    /// Code-point equality.
    #[default]
    Exact,
    /// ASCII case folded.
    IgnoreAsciiCase,
}

impl StringComparison {
    /// The comparison HTML prescribes for values of attribute `name`.
    #[must_use]
    pub fn for_attribute(name: &str) -> Self {
        if CASE_INSENSITIVE_ATTRIBUTES.contains(&name) {
            Self::IgnoreAsciiCase
        } else {
            Self::Exact
        }
    }

    /// `a == b` under this comparison.
    #[must_use]
    pub fn equals(self, a: &str, b: &str) -> bool {
        match self {
            Self::Exact => a == b,
            Self::IgnoreAsciiCase => a.eq_ignore_ascii_case(b),
        }
    }

    /// `haystack` starts with `needle` under this comparison.
    #[must_use]
    pub fn starts_with(self, haystack: &str, needle: &str) -> bool {
        match self {
            Self::Exact => haystack.starts_with(needle),
            Self::IgnoreAsciiCase => haystack
                .as_bytes()
                .get(..needle.len())
                .is_some_and(|h| h.eq_ignore_ascii_case(needle.as_bytes())),
        }
    }

    /// `haystack` ends with `needle` under this comparison.
    #[must_use]
    pub fn ends_with(self, haystack: &str, needle: &str) -> bool {
        match self {
            Self::Exact => haystack.ends_with(needle),
            Self::IgnoreAsciiCase => haystack
                .len()
                .checked_sub(needle.len())
                .and_then(|start| haystack.as_bytes().get(start..))
                .is_some_and(|h| h.eq_ignore_ascii_case(needle.as_bytes())),
        }
    }

    /// `haystack` contains `needle` under this comparison.
    #[must_use]
    pub fn contains(self, haystack: &str, needle: &str) -> bool {
        match self {
            Self::Exact => haystack.contains(needle),
            Self::IgnoreAsciiCase => haystack
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
        }
    }
}

/// An attribute test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTest {
    /// Lowercased attribute name.
    pub name: String,
    /// Value operand. Empty for `Exists`/`NotExists`.
    pub value: String,
    /// The operator.
    pub operator: AttributeSelectorType,
    /// Value comparison mode, fixed by the attribute name.
    pub comparison: StringComparison,
}

impl AttributeTest {
    /// Creates a test, deriving the comparison mode from the name.
    #[must_use]
    pub fn new(name: &str, operator: AttributeSelectorType, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        Self {
            comparison: StringComparison::for_attribute(&name),
            name,
            value: value.into(),
            operator,
        }
    }
}

/// A resolved pseudo-class reference.
#[derive(Debug, Clone)]
pub struct PseudoClause {
    /// Name without the colon, lowercased.
    pub name: String,
    /// Raw text between the parentheses, if any.
    pub arguments: Option<String>,
    /// The implementation.
    pub selector: PseudoSelector,
}

/// One atomic selector fragment.
#[derive(Debug, Clone, Default)]
pub struct SelectorClause {
    /// Tests present on this clause.
    pub selector_type: SelectorType,
    /// Relation to the previous clause.
    pub combinator: CombinatorType,
    /// Relation to the source nodes.
    pub traversal: TraversalType,
    /// Lowercased tag name.
    pub tag: Option<String>,
    /// Id, case-sensitive.
    pub id: Option<String>,
    /// Class name, case-sensitive.
    pub class: Option<String>,
    /// Attribute test.
    pub attribute: Option<AttributeTest>,
    /// Pseudo-class.
    pub pseudo: Option<PseudoClause>,
    /// Levels below the source for `Child` traversal.
    pub child_depth: usize,
    /// Explicit node list for `ELEMENTS` clauses.
    pub elements: Vec<NodeId>,
    /// Raw markup for `HTML` clauses.
    pub html: Option<String>,
    /// Forces manual matching even when an index is available.
    pub no_index: bool,
    /// The jQuery pseudo-class (`input`, `text`, ...) this clause is one
    /// alternative of, set on every clause of the expansion.
    pub expanded_from: Option<String>,
}

impl SelectorClause {
    /// Creates an empty clause.
    #[must_use]
    pub fn new(combinator: CombinatorType, traversal: TraversalType) -> Self {
        Self {
            combinator,
            traversal,
            child_depth: usize::from(traversal == TraversalType::Child),
            ..Self::default()
        }
    }

    /// A clause is complete once it carries at least one test.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.selector_type.is_empty()
    }

    /// Returns `true` if this clause only has a pseudo-class test.
    #[must_use]
    pub fn is_pseudo_only(&self) -> bool {
        self.selector_type == SelectorType::PSEUDO_CLASS
    }

    /// Writes the clause's tests without any combinator prefix.
    pub(crate) fn fmt_tests(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = self.selector_type;
        if ty.contains(SelectorType::HTML) {
            return f.write_str(self.html.as_deref().unwrap_or_default());
        }
        if ty.contains(SelectorType::ALL) {
            f.write_str("*")?;
        }
        if let Some(tag) = self.tag.as_deref().filter(|_| ty.contains(SelectorType::TAG)) {
            f.write_str(tag)?;
        }
        if let Some(id) = self.id.as_deref().filter(|_| ty.contains(SelectorType::ID)) {
            write!(f, "#{}", escape_name(id))?;
        }
        if let Some(class) = self.class.as_deref().filter(|_| ty.contains(SelectorType::CLASS)) {
            write!(f, ".{}", escape_name(class))?;
        }
        if let Some(attr) = self
            .attribute
            .as_ref()
            .filter(|_| ty.contains(SelectorType::ATTRIBUTE_VALUE))
        {
            match attr.operator {
                AttributeSelectorType::Exists => write!(f, "[{}]", attr.name)?,
                AttributeSelectorType::NotExists => write!(f, ":not([{}])", attr.name)?,
                op => write!(
                    f,
                    "[{}{}\"{}\"]",
                    attr.name,
                    op.as_str(),
                    attr.value.replace('\0', "").replace('"', "\\\"")
                )?,
            }
        }
        if let Some(pseudo) = self
            .pseudo
            .as_ref()
            .filter(|_| ty.contains(SelectorType::PSEUDO_CLASS))
        {
            write!(f, ":{}", pseudo.name)?;
            if let Some(args) = &pseudo.arguments {
                write!(f, "({args})")?;
            }
        }
        if ty.contains(SelectorType::ELEMENTS) {
            write!(f, "<{} elements>", self.elements.len())?;
        }
        Ok(())
    }
}

/// Backslash-escapes characters that would end a class or id name.
fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if !crate::scanner::chars::is_name_char(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_for_attribute() {
        assert_eq!(
            StringComparison::for_attribute("lang"),
            StringComparison::IgnoreAsciiCase
        );
        assert_eq!(StringComparison::for_attribute("type"), StringComparison::Exact);
        assert_eq!(StringComparison::for_attribute("id"), StringComparison::Exact);
    }

    #[test]
    fn test_case_insensitive_operations() {
        let cmp = StringComparison::IgnoreAsciiCase;
        assert!(cmp.equals("EN", "en"));
        assert!(cmp.starts_with("en-US", "EN"));
        assert!(cmp.ends_with("en-US", "us"));
        assert!(!cmp.ends_with("s", "us"));
        assert!(cmp.contains("abcDEF", "cd"));
        assert!(!StringComparison::Exact.contains("abcDEF", "cd"));
    }

    #[test]
    fn test_new_child_clause_has_depth_one() {
        let clause = SelectorClause::new(CombinatorType::Chained, TraversalType::Child);
        assert_eq!(clause.child_depth, 1);
        assert!(!clause.is_complete());
    }

    #[test]
    fn test_attribute_test_lowercases_name() {
        let test = AttributeTest::new("LANG", AttributeSelectorType::Equals, "en");
        assert_eq!(test.name, "lang");
        assert_eq!(test.comparison, StringComparison::IgnoreAsciiCase);
    }
}
