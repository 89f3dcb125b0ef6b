//! Loading and parsing of the `terraform.tfvars` variable file.
//!
//! Values from this file sit below environment variables in the precedence
//! order: they are folded into the defaults that resolution falls back to.

use std::collections::BTreeMap;
use std::path::Path;

/// A scalar tfvars value.
#[derive(Debug, Clone, PartialEq)]
pub enum TfValue {
    String(String),
    Bool(bool),
    Int(i64),
}

/// Parsed contents of a `terraform.tfvars` file.
#[derive(Debug, Clone, Default)]
pub struct TfVars {
    values: BTreeMap<String, TfValue>,
    loaded: bool,
}

impl TfVars {
    /// Read `terraform.tfvars` from the project root. A missing file is not
    /// an error; it yields an empty, unloaded map.
    pub fn discover(project_root: &Path) -> Self {
        let path = project_root.join("terraform.tfvars");
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "loaded terraform.tfvars");
                Self::parse(&content)
            }
            Err(_) => Self::default(),
        }
    }

    /// Parse tfvars content. Only scalar `key = value` assignments are
    /// recognized; comments, blank lines, and block constructs are skipped.
    pub fn parse(content: &str) -> Self {
        let mut values = BTreeMap::new();
        let mut depth = 0usize;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            // inside a block construct, only track nesting
            if depth > 0 {
                depth += line.matches(['{', '[']).count();
                depth = depth.saturating_sub(line.matches(['}', ']']).count());
                continue;
            }
            let Some((key, raw)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                continue;
            }
            let raw = raw.trim();
            if raw.starts_with(['{', '[']) {
                let opens = raw.matches(['{', '[']).count();
                let closes = raw.matches(['}', ']']).count();
                depth = opens.saturating_sub(closes);
                continue;
            }
            if let Some(value) = parse_scalar(raw) {
                values.insert(key.to_string(), value);
            }
        }
        Self {
            values,
            loaded: true,
        }
    }

    /// Whether a tfvars file was actually found and parsed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// String value for a variable. Non-string scalars render through their
    /// natural textual form.
    pub fn get_str(&self, name: &str) -> Option<String> {
        match self.values.get(name)? {
            TfValue::String(s) => Some(s.clone()),
            TfValue::Bool(b) => Some(b.to_string()),
            TfValue::Int(i) => Some(i.to_string()),
        }
    }

    /// Boolean value for a variable. Strings fall back to the textual truthy
    /// set used for environment variables.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            TfValue::Bool(b) => Some(*b),
            TfValue::String(s) => Some(matches!(
                s.to_ascii_lowercase().as_str(),
                "true" | "1" | "t" | "y" | "yes"
            )),
            TfValue::Int(i) => Some(*i != 0),
        }
    }

    /// Integer value for a variable, if it parses as one.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            TfValue::Int(i) => Some(*i),
            TfValue::String(s) => s.parse().ok(),
            TfValue::Bool(_) => None,
        }
    }

    /// Sorted names of all recognized variables.
    pub fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

fn parse_scalar(raw: &str) -> Option<TfValue> {
    if let Some(rest) = raw.strip_prefix('"') {
        let end = rest.find('"')?;
        return Some(TfValue::String(rest[..end].to_string()));
    }
    // strip a trailing comment from unquoted values
    let token = raw
        .split(|c: char| c == '#' || c.is_whitespace())
        .next()
        .unwrap_or("");
    if token.is_empty() {
        return None;
    }
    match token {
        "true" => Some(TfValue::Bool(true)),
        "false" => Some(TfValue::Bool(false)),
        _ => token.parse::<i64>().ok().map(TfValue::Int),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# comment line
aws_region           = "us-east-1"
root_domain          = "example.com"  # inline note
create_custom_domain = false
debug_mode           = true
lambda_memory_size   = 256

tags = {
  project = "openai"
}
"#;

    #[test]
    fn test_parse_scalars() {
        let tfvars = TfVars::parse(SAMPLE);
        assert_eq!(tfvars.get_str("aws_region"), Some("us-east-1".to_string()));
        assert_eq!(
            tfvars.get_str("root_domain"),
            Some("example.com".to_string())
        );
        assert_eq!(tfvars.get_bool("create_custom_domain"), Some(false));
        assert_eq!(tfvars.get_bool("debug_mode"), Some(true));
        assert_eq!(tfvars.get_int("lambda_memory_size"), Some(256));
    }

    #[test]
    fn test_blocks_and_comments_are_skipped() {
        let tfvars = TfVars::parse(SAMPLE);
        assert_eq!(tfvars.get_str("tags"), None);
        assert_eq!(tfvars.get_str("project"), None);
        assert!(tfvars.is_loaded());
    }

    #[test]
    fn test_names_are_sorted() {
        let tfvars = TfVars::parse(SAMPLE);
        assert_eq!(
            tfvars.names(),
            vec![
                "aws_region",
                "create_custom_domain",
                "debug_mode",
                "lambda_memory_size",
                "root_domain",
            ]
        );
    }

    #[test]
    fn test_string_coercions() {
        let tfvars = TfVars::parse("flag = \"Yes\"\ncount = \"12\"\n");
        assert_eq!(tfvars.get_bool("flag"), Some(true));
        assert_eq!(tfvars.get_int("count"), Some(12));
    }

    #[test]
    fn test_default_is_unloaded() {
        let tfvars = TfVars::default();
        assert!(!tfvars.is_loaded());
        assert!(tfvars.names().is_empty());
    }
}
