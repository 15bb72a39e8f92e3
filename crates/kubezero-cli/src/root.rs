use kubezero_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the KubeZero checkout root.
///
/// Priority:
/// 1. `--root` flag / `KUBEZERO_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.kubezero/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd, paths::KUBEZERO_DIR)
        .or_else(|| find_upward(&cwd, ".git"))
        .unwrap_or(cwd)
}

fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_root(Some(dir.path())), dir.path());
    }

    #[test]
    fn kubezero_dir_is_found_from_nested_path() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".kubezero")).unwrap();
        let nested = dir.path().join("registry/aws-management");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_upward(&nested, ".kubezero").as_deref(), Some(dir.path()));
    }

    #[test]
    fn kubezero_marker_beats_outer_git() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let inner = dir.path().join("kubezero");
        std::fs::create_dir_all(inner.join(".kubezero")).unwrap();
        let found = find_upward(&inner, ".kubezero").or_else(|| find_upward(&inner, ".git"));
        assert_eq!(found.as_deref(), Some(inner.as_path()));
    }
}
