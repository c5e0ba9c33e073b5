//! Explicit environment snapshot
//!
//! The resolver never reads the process environment on its own. Callers build
//! an [`Environment`] (usually once, at the CLI edge) and pass it in, so two
//! resolutions with different overrides can run side by side.

use std::collections::BTreeMap;

/// Immutable name/value snapshot of environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// An environment with no variables
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Raw lookup, including empty values
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Lookup that treats empty and whitespace-only values as unset
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_ignores_blank_values() {
        let env = Environment::empty()
            .with("STORE_PASSWORD", "")
            .with("KEY_ALIAS", "   ")
            .with("KEY_PASSWORD", "hunter2");

        assert_eq!(env.get("STORE_PASSWORD"), Some(""));
        assert_eq!(env.non_empty("STORE_PASSWORD"), None);
        assert_eq!(env.non_empty("KEY_ALIAS"), None);
        assert_eq!(env.non_empty("KEY_PASSWORD"), Some("hunter2"));
        assert_eq!(env.non_empty("MISSING"), None);
    }

    #[test]
    fn test_collect_from_pairs() {
        let env: Environment = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(env.get("B"), Some("2"));
    }
}
