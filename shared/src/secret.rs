//! Secret value wrapper and provenance tracking.

use std::fmt;

/// Wrapper for sensitive string values.
///
/// `Debug` and `Display` render a redaction marker; the inner value is only
/// reachable through [`SecretString::expose`]. An unset secret is the default
/// for API keys that were never supplied.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(Option<String>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(value.into()))
    }

    /// The null secret used as a default.
    pub fn none() -> Self {
        Self(None)
    }

    /// Whether a value is present.
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Reveal the wrapped value. Callers own the decision to log it.
    pub fn expose(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_some() {
            f.write_str("SecretString(***)")
        } else {
            f.write_str("SecretString(unset)")
        }
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() { "***" } else { "" })
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Which precedence tier supplied a secret. Diagnostic only, never used for
/// logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecretSource {
    #[default]
    Unset,
    EnvironmentVariable,
    InitArgument,
}

impl SecretSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretSource::Unset => "unset",
            SecretSource::EnvironmentVariable => "environment variable",
            SecretSource::InitArgument => "init argument",
        }
    }
}

impl fmt::Display for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for SecretSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_value() {
        let secret = SecretString::new("sk-abc123");
        assert_eq!(format!("{:?}", secret), "SecretString(***)");
        assert_eq!(format!("{}", secret), "***");
        assert_eq!(secret.expose(), Some("sk-abc123"));
    }

    #[test]
    fn test_unset_secret() {
        let secret = SecretString::none();
        assert!(!secret.is_set());
        assert_eq!(format!("{:?}", secret), "SecretString(unset)");
        assert_eq!(secret.expose(), None);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(SecretSource::Unset.to_string(), "unset");
        assert_eq!(
            SecretSource::EnvironmentVariable.to_string(),
            "environment variable"
        );
        assert_eq!(SecretSource::InitArgument.to_string(), "init argument");
    }
}
