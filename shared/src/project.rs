//! Project root discovery, shared by the tfvars and version loaders.

use std::path::{Path, PathBuf};

use crate::environment::Environment;

const ROOT_MARKERS: [&str; 2] = ["VERSION", "terraform.tfvars"];

/// Locate the project root.
///
/// An explicit `PROJECT_ROOT` variable wins. Otherwise walk up from the
/// current directory looking for a root marker, falling back to the current
/// directory itself.
pub fn project_root(env: &Environment) -> PathBuf {
    if let Some(root) = env.get("PROJECT_ROOT") {
        return PathBuf::from(root);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut dir: &Path = &cwd;
    loop {
        if ROOT_MARKERS.iter().any(|marker| dir.join(marker).is_file()) {
            return dir.to_path_buf();
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return cwd.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_env_override() {
        let env: Environment = [("PROJECT_ROOT".to_string(), "/opt/app".to_string())]
            .into_iter()
            .collect();
        assert_eq!(project_root(&env), PathBuf::from("/opt/app"));
    }

    #[test]
    fn test_discovery_finds_a_marker() {
        // the workspace carries a VERSION artifact above the crate root
        let env = Environment::default();
        let root = project_root(&env);
        assert!(ROOT_MARKERS.iter().any(|m| root.join(m).is_file()));
    }
}
