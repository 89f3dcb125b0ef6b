//! Semantic version derived from the VERSION artifact.
//!
//! The release pipeline writes prerelease markers like `0.1.17-next.2` or
//! `0.1.17-next-major.1` into the artifact; consumers always see the cleaned
//! semantic version.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;

static NEXT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-next\.\d+").expect("valid regex"));
static NEXT_MAJOR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-next-major\.\d+").expect("valid regex"));

/// Read the VERSION artifact and return the cleaned semantic version.
pub fn semantic_version(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)?;
    Ok(strip_prerelease(raw.trim()))
}

/// Strip `-next.<n>` and `-next-major.<n>` prerelease suffixes.
pub fn strip_prerelease(version: &str) -> String {
    let version = NEXT_SUFFIX.replace_all(version, "");
    NEXT_MAJOR_SUFFIX.replace_all(&version, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_version_is_unchanged() {
        assert_eq!(strip_prerelease("0.1.17"), "0.1.17");
    }

    #[test]
    fn test_next_suffix_is_stripped() {
        assert_eq!(strip_prerelease("0.1.17-next.1"), "0.1.17");
        assert_eq!(strip_prerelease("0.1.17-next.123456"), "0.1.17");
    }

    #[test]
    fn test_next_major_suffix_is_stripped() {
        assert_eq!(strip_prerelease("0.1.17-next-major.2"), "0.1.17");
        assert_eq!(strip_prerelease("0.1.17-next-major.123456"), "0.1.17");
    }
}
