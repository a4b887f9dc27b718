//! A cursor over selector text.
//!
//! [`StringScanner`] offers "expect" primitives that advance past a literal,
//! one of several literals, or a [`Pattern`] match, failing with a
//! position-annotated [`ScanError`]. Each primitive has a `try_` variant
//! that returns `None`/`false` instead and leaves the cursor untouched on
//! failure. After any successful expect, [`undo`](StringScanner::undo)
//! returns the cursor to where that expect started (one level only).
//!
//! Leading whitespace is skipped before each expect by default. The
//! selector parser turns this off because whitespace is a combinator there.

pub mod chars;
pub mod patterns;

use crate::error::ScanError;

use chars::is_html_whitespace;
use patterns::{Bounded, Pattern};

/// A cursor over a string, with single-level backtracking.
#[derive(Debug, Clone)]
pub struct StringScanner {
    source: Vec<char>,
    index: usize,
    /// Cursor position before the last successful expect.
    previous: Option<usize>,
    skip_whitespace: bool,
}

impl StringScanner {
    /// Creates a scanner positioned at the start of `text`.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            source: text.chars().collect(),
            index: 0,
            previous: None,
            skip_whitespace: true,
        }
    }

    /// Sets whether expects skip leading whitespace (builder style).
    #[must_use]
    pub fn skip_whitespace_automatically(mut self, yes: bool) -> Self {
        self.skip_whitespace = yes;
        self
    }

    /// The whole input.
    #[must_use]
    pub fn source(&self) -> &[char] {
        &self.source
    }

    /// Current 0-based character offset.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The character under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<char> {
        self.source.get(self.index).copied()
    }

    /// The character `offset` places after the cursor.
    #[must_use]
    pub fn peek(&self, offset: usize) -> Option<char> {
        self.source.get(self.index + offset).copied()
    }

    /// Returns `true` once the cursor has passed the last character.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.index >= self.source.len()
    }

    /// The unconsumed input.
    #[must_use]
    pub fn remainder(&self) -> String {
        self.source[self.index.min(self.source.len())..]
            .iter()
            .collect()
    }

    /// Returns `true` if the unconsumed input starts with `literal`.
    #[must_use]
    pub fn match_str(&self, literal: &str) -> bool {
        let mut pos = self.index;
        for c in literal.chars() {
            if self.source.get(pos) != Some(&c) {
                return false;
            }
            pos += 1;
        }
        true
    }

    /// Consumes and returns the character under the cursor.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.previous = Some(self.index);
        self.index += 1;
        Some(c)
    }

    /// Skips whitespace, returning `true` if any was skipped.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.index;
        while self.current().is_some_and(is_html_whitespace) {
            self.index += 1;
        }
        self.index > start
    }

    /// Returns the cursor to where the last successful expect started.
    pub fn undo(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.index = previous;
        }
    }

    /// Builds an error at the cursor.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> ScanError {
        self.error_at(message, self.index)
    }

    /// Builds an error at `position`.
    #[must_use]
    pub fn error_at(&self, message: impl Into<String>, position: usize) -> ScanError {
        ScanError::new(message, &self.source, position)
    }

    /// Runs `attempt` from the post-whitespace position; on success records
    /// the pre-whitespace position for `undo`, on failure restores it.
    fn attempt<T>(&mut self, attempt: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let start = self.index;
        if self.skip_whitespace {
            self.skip_whitespace();
        }
        if let Some(value) = attempt(self) {
            self.previous = Some(start);
            Some(value)
        } else {
            self.index = start;
            None
        }
    }

    /// Consumes `literal` if it is next.
    pub fn try_expect(&mut self, literal: &str) -> bool {
        self.attempt(|s| {
            if s.match_str(literal) {
                s.index += literal.chars().count();
                Some(())
            } else {
                None
            }
        })
        .is_some()
    }

    /// Consumes `literal` or fails.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` if `literal` is not next.
    pub fn expect(&mut self, literal: &str) -> Result<(), ScanError> {
        if self.try_expect(literal) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{literal}'")))
        }
    }

    /// Consumes the first of `options` that is next, returning its index.
    ///
    /// Longer options should be listed before their prefixes.
    pub fn try_expect_one_of(&mut self, options: &[&str]) -> Option<usize> {
        self.attempt(|s| {
            let found = options.iter().position(|o| s.match_str(o))?;
            s.index += options[found].chars().count();
            Some(found)
        })
    }

    /// Consumes one of `options` or fails.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` listing the options if none is next.
    pub fn expect_one_of(&mut self, options: &[&str]) -> Result<usize, ScanError> {
        self.try_expect_one_of(options).ok_or_else(|| {
            let list = options
                .iter()
                .map(|o| format!("'{o}'"))
                .collect::<Vec<_>>()
                .join(", ");
            self.expected(&format!("one of {list}"))
        })
    }

    /// Consumes a match of `pattern`, returning its output.
    pub fn try_pattern(&mut self, pattern: &dyn Pattern) -> Option<String> {
        self.attempt(|s| {
            let start = s.index;
            let end = pattern.validate(&s.source, start)?;
            s.index = end;
            Some(pattern.output(&s.source, start, end))
        })
    }

    /// Consumes a match of `pattern` or fails.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` naming what the pattern expects.
    pub fn expect_pattern(&mut self, pattern: &dyn Pattern) -> Result<String, ScanError> {
        match self.try_pattern(pattern) {
            Some(output) => Ok(output),
            None => Err(self.expected(&pattern.description())),
        }
    }

    /// Consumes text enclosed by `open` and its closing delimiter, returning
    /// the inner text.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` if the delimiters are missing or unbalanced.
    pub fn get_bounded_by(&mut self, open: char, honor_quotes: bool) -> Result<String, ScanError> {
        self.expect_pattern(&Bounded::new(open).honor_quotes(honor_quotes))
    }

    fn expected(&self, what: &str) -> ScanError {
        let mut position = self.index;
        if self.skip_whitespace {
            while self.source.get(position).copied().is_some_and(is_html_whitespace) {
                position += 1;
            }
        }
        let found = match self.source.get(position) {
            Some(c) => format!("found '{c}'"),
            None => "reached end of input".to_owned(),
        };
        self.error_at(format!("expected {what}, {found}"), position)
    }
}
