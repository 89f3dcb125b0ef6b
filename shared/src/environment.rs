//! Immutable snapshot of the process environment.

use std::collections::HashMap;

/// Environment variables captured once at settings construction.
///
/// Tests build synthetic snapshots with `FromIterator` instead of mutating
/// process-global state.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    dotenv_loaded: bool,
}

impl Environment {
    /// Capture the current process environment, loading a `.env` file first
    /// if one is present.
    pub fn capture() -> Self {
        let dotenv_loaded = dotenvy::dotenv().is_ok();
        Self {
            vars: std::env::vars().collect(),
            dotenv_loaded,
        }
    }

    /// Value of a variable, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Whether the variable was set at capture time, regardless of value.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Whether a `.env` file contributed to this snapshot.
    pub fn is_using_dotenv_file(&self) -> bool {
        self.dotenv_loaded
    }

    /// Sorted names of all captured variables.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.keys().cloned().collect();
        names.sort();
        names
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().collect(),
            dotenv_loaded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Environment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_get_and_contains() {
        let env = snapshot(&[("DEBUG_MODE", "true"), ("EMPTY", "")]);
        assert_eq!(env.get("DEBUG_MODE"), Some("true"));
        assert_eq!(env.get("MISSING"), None);
        assert!(env.contains("EMPTY"));
        assert!(!env.contains("MISSING"));
    }

    #[test]
    fn test_names_are_sorted() {
        let env = snapshot(&[("ZEBRA", "1"), ("ALPHA", "2"), ("MIKE", "3")]);
        assert_eq!(env.names(), vec!["ALPHA", "MIKE", "ZEBRA"]);
    }

    #[test]
    fn test_synthetic_snapshot_has_no_dotenv() {
        let env = snapshot(&[]);
        assert!(!env.is_using_dotenv_file());
    }
}
