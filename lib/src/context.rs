//! Variable bindings shared across an expression tree and its constraints.
use std::collections::HashMap;

/// A cheap-to-copy name-to-value mapping with explicit "undefined"
/// semantics: a variable is undefined if and only if its name is absent
/// from the map. Unlike the distilled-from source, `0.0` is never
/// mistaken for undefined — presence of the key is the only test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: HashMap<String, f64>,
}

impl Context {
    pub fn new() -> Context {
        Context {
            values: HashMap::new(),
        }
    }

    /// Current value of `name`, or `None` if it has never been set.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn unset(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// An independent copy; mutating the clone never affects `self`.
    pub fn copy(&self) -> Context {
        self.clone()
    }

    /// A new context with every binding in `self` plus every binding in
    /// `overrides`; on a name collision, `overrides` wins.
    pub fn extended_with(&self, overrides: &Context) -> Context {
        let mut merged = self.clone();
        for (name, value) in &overrides.values {
            merged.values.insert(name.clone(), *value);
        }
        merged
    }
}

impl FromIterator<(String, f64)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Context {
            values: iter.into_iter().collect(),
        }
    }
}
