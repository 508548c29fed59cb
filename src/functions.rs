//! Registered function set.
//!
//! Functions registered with the persistence provider can be invoked with the
//! provider's native syntax. Everything else has to go through the generic
//! `FUNCTION('name', ...)` form, if the dialect offers it.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Names of the functions the set-operation, limit and count encodings
/// produce. Installing the provider extension registers all of them.
pub static BUILTIN_FUNCTIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "limit",
        "count_star",
        "set_union",
        "set_union_all",
        "set_intersect",
        "set_intersect_all",
        "set_except",
        "set_except_all",
        "group_concat",
        "cast_string",
    ]
});

/// Case-insensitive set of registered function names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRegistry {
    names: BTreeSet<String>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with [`BUILTIN_FUNCTIONS`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for name in BUILTIN_FUNCTIONS.iter() {
            registry.register(name);
        }
        registry
    }

    pub fn register(&mut self, name: &str) -> &mut Self {
        self.names.insert(name.to_lowercase());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for FunctionRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut registry = Self::new();
        for name in iter {
            registry.register(name.as_ref());
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let registry: FunctionRegistry = ["Add_Days"].into_iter().collect();
        assert!(registry.contains("ADD_DAYS"));
        assert!(registry.contains("add_days"));
        assert!(!registry.contains("add_months"));
    }

    #[test]
    fn test_builtins() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.contains("LIMIT"));
        assert!(registry.contains("SET_UNION_ALL"));
        assert_eq!(registry.len(), BUILTIN_FUNCTIONS.len());
    }
}
