//! Pseudo-class selectors and their registry.
//!
//! A pseudo-class is either an [`ElementPseudo`], judged against one
//! element's position in the live tree (`:nth-child`, `:empty`), or a
//! [`FilterPseudo`], judged against an element's position in an already
//! computed result sequence (`:eq`, `:first`). The engine treats the two
//! differently, so the split is fixed when the clause is built.
//!
//! Names resolve through a [`PseudoRegistry`] of factories. Factories
//! receive the raw argument text and validate it, so a selector with a bad
//! argument fails at parse time rather than at match time.

mod builtins;
mod filters;
mod nth;

pub use builtins::BuiltinPseudoSelectors;
pub use nth::NthExpression;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::{Result, SelectorError};
use crate::selector::Selector;
use crate::tree::{Document, NodeId};

/// A pseudo-class evaluated per element against the live tree.
pub trait ElementPseudo: Send + Sync {
    /// Returns `true` if `element` satisfies the pseudo-class.
    ///
    /// # Errors
    ///
    /// Pseudo-classes that run a nested selector return its error.
    fn matches(&self, doc: &Document, element: NodeId) -> Result<bool>;

    /// Returns the element children of `parent` that satisfy the
    /// pseudo-class, in document order.
    ///
    /// The engine calls this for `parent > :pseudo` so implementations that
    /// depend on sibling position can compute it once per parent.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`matches`](Self::matches).
    fn matching_children(&self, doc: &Document, parent: NodeId) -> Result<Vec<NodeId>> {
        let mut found = Vec::new();
        for child in doc.element_children(parent) {
            if self.matches(doc, child)? {
                found.push(child);
            }
        }
        Ok(found)
    }
}

/// A pseudo-class evaluated against a whole result sequence.
pub trait FilterPseudo: Send + Sync {
    /// Returns the members of `selection` that pass, in `selection` order.
    ///
    /// # Errors
    ///
    /// Pseudo-classes that run a nested selector return its error.
    fn filter(&self, doc: &Document, selection: &[NodeId]) -> Result<Vec<NodeId>>;
}

/// A resolved pseudo-class implementation.
#[derive(Clone)]
pub enum PseudoSelector {
    /// Evaluated per element.
    Element(Arc<dyn ElementPseudo>),
    /// Evaluated on the result sequence.
    Filter(Arc<dyn FilterPseudo>),
}

impl PseudoSelector {
    /// Wraps an element pseudo-class.
    pub fn element(pseudo: impl ElementPseudo + 'static) -> Self {
        Self::Element(Arc::new(pseudo))
    }

    /// Wraps a result-list pseudo-class.
    pub fn filter(pseudo: impl FilterPseudo + 'static) -> Self {
        Self::Filter(Arc::new(pseudo))
    }

    /// Returns `true` for result-list pseudo-classes.
    #[must_use]
    pub fn is_filter(&self) -> bool {
        matches!(self, Self::Filter(_))
    }
}

impl fmt::Debug for PseudoSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(_) => f.write_str("PseudoSelector::Element"),
            Self::Filter(_) => f.write_str("PseudoSelector::Filter"),
        }
    }
}

/// What a factory receives when a selector names its pseudo-class.
#[derive(Clone, Copy)]
pub struct PseudoArguments<'a> {
    /// The pseudo-class name, lowercased, without the colon.
    pub name: &'a str,
    /// Trimmed text between the parentheses, if present.
    pub raw: Option<&'a str>,
    /// The registry resolving this name, for pseudo-classes whose argument
    /// is itself a selector.
    pub registry: &'a PseudoRegistry,
}

impl PseudoArguments<'_> {
    /// Builds an [`SelectorError::InvalidArguments`] for this pseudo-class.
    #[must_use]
    pub fn invalid(&self, message: impl Into<String>) -> SelectorError {
        SelectorError::InvalidArguments {
            name: self.name.to_owned(),
            message: message.into(),
        }
    }

    /// Fails if any argument was supplied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` when parentheses were present.
    pub fn expect_none(&self) -> Result<()> {
        match self.raw {
            None => Ok(()),
            Some(_) => Err(self.invalid("takes no arguments")),
        }
    }

    /// Returns the non-empty argument text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` when the argument is missing or empty.
    pub fn expect_one(&self) -> Result<&str> {
        match self.raw {
            Some(raw) if !raw.is_empty() => Ok(raw),
            _ => Err(self.invalid("requires one argument")),
        }
    }

    /// Compiles the argument as a nested selector through the same registry.
    ///
    /// # Errors
    ///
    /// Returns the nested selector's parse error, or `InvalidArguments`
    /// when the argument is missing or is HTML text rather than a query.
    pub fn expect_selector(&self) -> Result<Selector> {
        let selector = Selector::parse_with(self.expect_one()?, self.registry)?;
        if selector.is_html() {
            return Err(self.invalid("expected a selector, found HTML"));
        }
        Ok(selector)
    }

    /// Parses the argument as an integer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` when the argument is missing or not an integer.
    pub fn expect_integer(&self) -> Result<i64> {
        let raw = self.expect_one()?;
        raw.parse()
            .map_err(|_| self.invalid(format!("expected an integer, found '{raw}'")))
    }
}

/// Builds a pseudo-class implementation from its arguments.
pub type PseudoFactory =
    Arc<dyn Fn(&PseudoArguments<'_>) -> Result<PseudoSelector> + Send + Sync>;

/// A bundle of pseudo-classes registered together.
///
/// Implement this to ship a library of extensions and load it with
/// [`PseudoRegistry::register_set`].
pub trait PseudoSelectorSet {
    /// The `(name, factory)` pairs this set provides.
    fn pseudo_selectors(&self) -> Vec<(&'static str, PseudoFactory)>;
}

/// A thread-safe map from pseudo-class name to factory.
///
/// [`global`](Self::global) holds the process-wide instance used by
/// [`Selector::parse`](crate::Selector::parse). Tests and embedders that
/// want isolation build their own and pass it to
/// [`Selector::parse_with`](crate::Selector::parse_with).
pub struct PseudoRegistry {
    factories: RwLock<HashMap<String, PseudoFactory>>,
}

impl fmt::Debug for PseudoRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PseudoRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl Default for PseudoRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PseudoRegistry {
    /// Creates a registry with no pseudo-classes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry holding the built-in pseudo-classes.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_set(&BuiltinPseudoSelectors);
        registry
    }

    /// The process-wide registry, created with the built-ins on first use.
    pub fn global() -> &'static PseudoRegistry {
        static GLOBAL: OnceLock<PseudoRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn(&PseudoArguments<'_>) -> Result<PseudoSelector> + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(factory));
    }

    /// Registers every pseudo-class in `set`.
    pub fn register_set(&self, set: &dyn PseudoSelectorSet) {
        for (name, factory) in set.pseudo_selectors() {
            self.insert(name, factory);
        }
    }

    fn insert(&self, name: &str, factory: PseudoFactory) {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_ascii_lowercase(), factory);
    }

    /// Removes `name`. Returns `true` if it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name.to_ascii_lowercase())
            .is_some()
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factory(name).is_some()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn factory(&self, name: &str) -> Option<PseudoFactory> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    /// Instantiates `name` with `arguments`, or `Ok(None)` if unregistered.
    ///
    /// The factory runs without the registry lock held, so it may itself
    /// parse selectors against this registry.
    ///
    /// # Errors
    ///
    /// Propagates the factory's argument validation error.
    pub fn try_get_instance(
        &self,
        name: &str,
        arguments: Option<&str>,
    ) -> Result<Option<PseudoSelector>> {
        let Some(factory) = self.factory(name) else {
            return Ok(None);
        };
        let name = name.to_ascii_lowercase();
        let args = PseudoArguments {
            name: &name,
            raw: arguments.map(str::trim),
            registry: self,
        };
        factory(&args).map(Some)
    }

    /// Instantiates `name` with `arguments`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPseudoSelector` if `name` is not registered, or the
    /// factory's argument validation error.
    pub fn get_instance(&self, name: &str, arguments: Option<&str>) -> Result<PseudoSelector> {
        self.try_get_instance(name, arguments)?
            .ok_or_else(|| SelectorError::UnknownPseudoSelector {
                name: name.to_owned(),
                position: 0,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Never;

    impl ElementPseudo for Never {
        fn matches(&self, _doc: &Document, _element: NodeId) -> Result<bool> {
            Ok(false)
        }
    }

    struct Extras;

    impl PseudoSelectorSet for Extras {
        fn pseudo_selectors(&self) -> Vec<(&'static str, PseudoFactory)> {
            vec![
                ("never", Arc::new(|_: &PseudoArguments<'_>| Ok(PseudoSelector::element(Never)))),
                ("nothing", Arc::new(|_: &PseudoArguments<'_>| Ok(PseudoSelector::element(Never)))),
            ]
        }
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = PseudoRegistry::new();
        assert!(!registry.contains("never"));
        registry.register("Never", |args| {
            args.expect_none()?;
            Ok(PseudoSelector::element(Never))
        });
        assert!(registry.contains("NEVER"));
        assert!(registry.get_instance("never", None).is_ok());
        assert!(matches!(
            registry.get_instance("never", Some("1")),
            Err(SelectorError::InvalidArguments { .. })
        ));
        assert!(registry.unregister("never"));
        assert!(!registry.unregister("never"));
    }

    #[test]
    fn test_unknown_name() {
        let registry = PseudoRegistry::new();
        assert!(registry.try_get_instance("bogus", None).unwrap().is_none());
        assert!(matches!(
            registry.get_instance("bogus", None),
            Err(SelectorError::UnknownPseudoSelector { .. })
        ));
    }

    #[test]
    fn test_register_set() {
        let registry = PseudoRegistry::new();
        registry.register_set(&Extras);
        assert_eq!(registry.names(), vec!["never", "nothing"]);
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = PseudoRegistry::with_builtins();
        for name in ["first-child", "nth-child", "eq", "has", "not", "contains", "odd"] {
            assert!(registry.contains(name), "{name}");
        }
        assert!(registry.get_instance("eq", Some("x")).is_err());
        assert!(registry.get_instance("first", None).unwrap().is_filter());
        assert!(!registry.get_instance("empty", None).unwrap().is_filter());
    }

    #[test]
    fn test_factory_can_reenter_registry() {
        let registry = PseudoRegistry::with_builtins();
        // :has parses its argument against the same registry.
        assert!(registry.get_instance("has", Some("p:first-child")).is_ok());
    }
}
