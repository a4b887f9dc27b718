//! Name tokenizer.
//!
//! Index keys never carry strings. Every tag name, attribute name, class
//! name, and id value that enters a [`Document`](super::Document) is interned
//! here and referenced by a small integer [`Token`], so an index key is a
//! short run of integers that compares and sorts cheaply.
//!
//! Tag and attribute names are interned ASCII-lowercased by the tree layer;
//! class names and ids are interned verbatim because they match
//! case-sensitively.

use std::collections::HashMap;
use std::num::NonZeroU32;

/// An interned name.
///
/// Two tokens are equal if and only if they were produced for the same string
/// by the same [`TokenTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Token(NonZeroU32);

impl Token {
    /// Returns the raw token value.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0.get()
    }
}

/// A name interning table owned by one document.
#[derive(Debug)]
pub struct TokenTable {
    map: HashMap<String, Token>,
    /// Token value -> string. Index 0 is unused (`NonZeroU32`).
    names: Vec<String>,
}

impl TokenTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            names: vec![String::new()],
        }
    }

    /// Interns `name`, returning the existing token if it was seen before.
    #[allow(clippy::cast_possible_truncation, clippy::expect_used)]
    pub fn intern(&mut self, name: &str) -> Token {
        if let Some(&token) = self.map.get(name) {
            return token;
        }
        // names.len() starts at 1, so the value is never zero.
        let token = Token(
            NonZeroU32::new(self.names.len() as u32).expect("token value overflow"),
        );
        self.names.push(name.to_owned());
        self.map.insert(name.to_owned(), token);
        token
    }

    /// Looks up `name` without interning it.
    ///
    /// Returns `None` when no node in the owning document has ever used this
    /// name, which lets callers short-circuit index lookups.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Token> {
        self.map.get(name).copied()
    }

    /// Resolves a token back to its name.
    ///
    /// # Panics
    ///
    /// Panics if the token was not created by this table.
    #[must_use]
    pub fn resolve(&self, token: Token) -> &str {
        &self.names[token.0.get() as usize]
    }

    /// Returns the number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len() - 1
    }

    /// Returns `true` if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut table = TokenTable::new();
        let a = table.intern("div");
        let b = table.intern("div");
        let c = table.intern("span");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.resolve(c), "span");
    }

    #[test]
    fn test_get_does_not_intern() {
        let mut table = TokenTable::new();
        assert_eq!(table.get("p"), None);
        assert!(table.is_empty());
        let p = table.intern("p");
        assert_eq!(table.get("p"), Some(p));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_tokens_are_case_sensitive() {
        let mut table = TokenTable::new();
        assert_ne!(table.intern("Foo"), table.intern("foo"));
    }

    #[test]
    fn test_first_token_is_one() {
        let mut table = TokenTable::new();
        assert_eq!(table.intern("first").as_u32(), 1);
    }
}
