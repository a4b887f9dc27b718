//! Pluggable matchers for [`StringScanner::expect_pattern`](super::StringScanner::expect_pattern).
//!
//! A [`Pattern`] inspects the scanner's character buffer from a start index
//! and reports where its match ends. It may also transform the matched text
//! into its output, e.g. stripping quotes or delimiters.

use super::chars::{
    is_alpha, is_attribute_char, is_digit, is_html_whitespace, is_name_char, is_name_start,
    is_quote, is_tag_char, is_tag_start,
};

/// A matcher over a character buffer.
pub trait Pattern {
    /// Tries to match at `start`. Returns the exclusive end index on success.
    fn validate(&self, source: &[char], start: usize) -> Option<usize>;

    /// The text produced by a successful match of `source[start..end]`.
    fn output(&self, source: &[char], start: usize, end: usize) -> String {
        source[start..end].iter().collect()
    }

    /// What the pattern expects, for error messages.
    fn description(&self) -> String;
}

/// Length of the run of characters satisfying `pred` starting at `start`.
fn run_length(source: &[char], start: usize, pred: impl Fn(char) -> bool) -> usize {
    source[start.min(source.len())..]
        .iter()
        .take_while(|&&c| pred(c))
        .count()
}

/// Removes CSS backslash escapes from `chars`.
fn unescape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut iter = chars.iter();
    while let Some(&c) = iter.next() {
        if c == '\\' {
            if let Some(&next) = iter.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// One or more ASCII letters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Alpha;

impl Pattern for Alpha {
    fn validate(&self, source: &[char], start: usize) -> Option<usize> {
        let len = run_length(source, start, is_alpha);
        (len > 0).then_some(start + len)
    }

    fn description(&self) -> String {
        "letters".to_owned()
    }
}

/// An optionally negative integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Number {
    /// When set, the number must be followed by whitespace or end of input.
    pub require_terminator: bool,
}

impl Pattern for Number {
    fn validate(&self, source: &[char], start: usize) -> Option<usize> {
        let mut pos = start;
        if matches!(source.get(pos), Some('-' | '+')) {
            pos += 1;
        }
        let digits = run_length(source, pos, is_digit);
        if digits == 0 {
            return None;
        }
        pos += digits;
        if self.require_terminator && source.get(pos).is_some_and(|&c| !is_html_whitespace(c)) {
            return None;
        }
        Some(pos)
    }

    fn description(&self) -> String {
        "a number".to_owned()
    }
}

/// An HTML tag name: a letter followed by letters, digits, `-` or `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTagName;

impl Pattern for HtmlTagName {
    fn validate(&self, source: &[char], start: usize) -> Option<usize> {
        if !source.get(start).is_some_and(|&c| is_tag_start(c)) {
            return None;
        }
        Some(start + 1 + run_length(source, start + 1, is_tag_char))
    }

    fn description(&self) -> String {
        "a tag name".to_owned()
    }
}

/// An HTML attribute name.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlAttributeName;

impl Pattern for HtmlAttributeName {
    fn validate(&self, source: &[char], start: usize) -> Option<usize> {
        let len = run_length(source, start, is_attribute_char);
        (len > 0).then_some(start + len)
    }

    fn description(&self) -> String {
        "an attribute name".to_owned()
    }
}

/// Matches CSS identifier characters and backslash escapes from `pos`.
fn css_name_tail(source: &[char], mut pos: usize) -> usize {
    loop {
        match source.get(pos) {
            Some('\\') if pos + 1 < source.len() => pos += 2,
            Some(&c) if is_name_char(c) => pos += 1,
            _ => return pos,
        }
    }
}

/// A CSS class name: an identifier, optionally with a leading `-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssClassName;

impl Pattern for CssClassName {
    fn validate(&self, source: &[char], start: usize) -> Option<usize> {
        let mut pos = start;
        if source.get(pos) == Some(&'-') {
            pos += 1;
        }
        match source.get(pos) {
            Some('\\') if pos + 1 < source.len() => {}
            Some(&c) if is_name_start(c) => {}
            _ => return None,
        }
        Some(css_name_tail(source, pos))
    }

    fn output(&self, source: &[char], start: usize, end: usize) -> String {
        unescape(&source[start..end])
    }

    fn description(&self) -> String {
        "a class name".to_owned()
    }
}

/// An element id. Unlike class names, ids may start with a digit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssId;

impl Pattern for CssId {
    fn validate(&self, source: &[char], start: usize) -> Option<usize> {
        let end = css_name_tail(source, start);
        (end > start).then_some(end)
    }

    fn output(&self, source: &[char], start: usize, end: usize) -> String {
        unescape(&source[start..end])
    }

    fn description(&self) -> String {
        "an id".to_owned()
    }
}

/// Text enclosed by a delimiter pair, with nesting.
///
/// `(`, `[`, `{` and `<` close with their mirror character; any other
/// character closes with itself (and then cannot nest). With
/// `honor_quotes`, delimiters inside quoted text are ignored. The output is
/// the text between the outermost delimiters.
#[derive(Debug, Clone, Copy)]
pub struct Bounded {
    open: char,
    close: char,
    honor_quotes: bool,
}

impl Bounded {
    /// Creates a matcher opened by `open`.
    #[must_use]
    pub fn new(open: char) -> Self {
        let close = match open {
            '(' => ')',
            '[' => ']',
            '{' => '}',
            '<' => '>',
            other => other,
        };
        Self {
            open,
            close,
            honor_quotes: false,
        }
    }

    /// Ignores delimiters that appear inside single or double quotes.
    #[must_use]
    pub fn honor_quotes(mut self, yes: bool) -> Self {
        self.honor_quotes = yes;
        self
    }
}

impl Pattern for Bounded {
    fn validate(&self, source: &[char], start: usize) -> Option<usize> {
        if source.get(start) != Some(&self.open) {
            return None;
        }
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        let mut pos = start + 1;
        while let Some(&c) = source.get(pos) {
            pos += 1;
            if let Some(q) = quote {
                if c == '\\' {
                    pos += 1;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            if self.honor_quotes && is_quote(c) {
                quote = Some(c);
            } else if c == self.close {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            } else if c == self.open {
                depth += 1;
            }
        }
        None
    }

    fn output(&self, source: &[char], start: usize, end: usize) -> String {
        source[start + 1..end - 1].iter().collect()
    }

    fn description(&self) -> String {
        format!("text enclosed by '{}' and '{}'", self.open, self.close)
    }
}

/// A value that is either quoted or runs up to one of the terminators.
///
/// Quoted values may contain backslash escapes and must be closed; the
/// output excludes the quotes. Unquoted values may be empty, stop before
/// the first terminator (which is not consumed), and are trimmed.
#[derive(Debug, Clone)]
pub struct OptionallyQuoted {
    terminators: Vec<char>,
}

impl OptionallyQuoted {
    /// Creates a matcher for values ended by any of `terminators`.
    #[must_use]
    pub fn new(terminators: &[char]) -> Self {
        Self {
            terminators: terminators.to_vec(),
        }
    }
}

impl Pattern for OptionallyQuoted {
    fn validate(&self, source: &[char], start: usize) -> Option<usize> {
        match source.get(start) {
            Some(&q) if is_quote(q) => {
                let mut pos = start + 1;
                while let Some(&c) = source.get(pos) {
                    match c {
                        '\\' => pos += 2,
                        c if c == q => return Some(pos + 1),
                        _ => pos += 1,
                    }
                }
                None
            }
            _ => Some(start + run_length(source, start, |c| !self.terminators.contains(&c))),
        }
    }

    fn output(&self, source: &[char], start: usize, end: usize) -> String {
        match source.get(start) {
            Some(&q) if is_quote(q) && end > start + 1 => unescape(&source[start + 1..end - 1]),
            _ => source[start..end].iter().collect::<String>().trim().to_owned(),
        }
    }

    fn description(&self) -> String {
        let list: String = self.terminators.iter().collect();
        format!("a value terminated by one of \"{list}\"")
    }
}
