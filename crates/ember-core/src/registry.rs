//! Rule registry for kind-keyed symbolic lowering.

use crate::symbolic::KindSymbolic;
use std::collections::HashMap;

/// Registry of kind-keyed lowering rules.
///
/// Maps traced operator kinds (e.g. "add", "max_pool2d") to their
/// [`KindSymbolic`] implementations. The export pass looks rules up here for
/// every generic node; the registry is the plugin boundary that makes the
/// rule set swappable in tests.
///
/// # Example
///
/// ```ignore
/// let mut registry = SymbolicRegistry::new();
/// registry.register("add", AddSymbolic::new());
/// registry.register("view", ViewSymbolic);
///
/// let rule = registry.get("add").unwrap();
/// ```
pub struct SymbolicRegistry {
    /// Map from traced operator kind to lowering rule.
    rules: HashMap<String, Box<dyn KindSymbolic>>,
}

impl SymbolicRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Register a rule for an operator kind.
    ///
    /// Returns `self` for method chaining.
    pub fn register<R>(&mut self, kind: &str, rule: R) -> &mut Self
    where
        R: KindSymbolic + 'static,
    {
        self.rules.insert(kind.to_string(), Box::new(rule));
        self
    }

    /// Look up a rule by operator kind.
    ///
    /// Returns `None` if no rule is registered for the given kind.
    pub fn get(&self, kind: &str) -> Option<&dyn KindSymbolic> {
        self.rules.get(kind).map(|rule| rule.as_ref())
    }

    /// Check if a rule is registered for an operator kind.
    pub fn contains(&self, kind: &str) -> bool {
        self.rules.contains_key(kind)
    }

    /// Get the number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over all registered operator kinds.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(|s| s.as_str())
    }
}

impl Default for SymbolicRegistry {
    fn default() -> Self {
        Self::new()
    }
}
