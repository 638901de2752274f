//! Case-insensitive lookup of module folders and files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Find the directory under `base` whose name equals `name` ignoring ASCII case.
///
/// Entries are compared in sorted order and the first match wins. When several
/// entries collide the collision is logged and the first one is still returned.
/// Returns `None` if `base` cannot be listed or nothing matches.
#[must_use]
pub fn resolve_dir_ci(base: &Path, name: &str) -> Option<PathBuf> {
    resolve_ci(base, name, true)
}

/// Same as [`resolve_dir_ci`] for regular files.
#[must_use]
pub fn resolve_file_ci(base: &Path, name: &str) -> Option<PathBuf> {
    resolve_ci(base, name, false)
}

/// First of `names` that resolves under `base` as a file.
#[must_use]
pub fn resolve_first_file_ci(base: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().find_map(|name| resolve_file_ci(base, name))
}

fn resolve_ci(base: &Path, name: &str, want_dir: bool) -> Option<PathBuf> {
    let entries = fs::read_dir(base).ok()?;
    let mut matches: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_type()
                .map(|ft| if want_dir { ft.is_dir() } else { ft.is_file() })
                .unwrap_or(false)
        })
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|entry| entry.eq_ignore_ascii_case(name))
        .collect();
    matches.sort_unstable();

    if matches.len() > 1 {
        warn!(
            base = %base.display(),
            name,
            candidates = ?matches,
            chosen = %matches[0],
            "Case-insensitive name collision"
        );
    }
    matches.into_iter().next().map(|entry| base.join(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_matches_any_case() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("Blog")).unwrap();
        assert_eq!(
            resolve_dir_ci(root.path(), "blog"),
            Some(root.path().join("Blog"))
        );
        assert_eq!(resolve_dir_ci(root.path(), "shop"), None);
    }

    #[test]
    fn test_kind_is_respected() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("routes"), "x").unwrap();
        assert_eq!(resolve_dir_ci(root.path(), "ROUTES"), None);
        assert_eq!(
            resolve_file_ci(root.path(), "ROUTES"),
            Some(root.path().join("routes"))
        );
    }

    #[test]
    fn test_collision_picks_first_sorted() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("views")).unwrap();
        if fs::create_dir(root.path().join("Views")).is_err() {
            // case-insensitive filesystem, nothing to collide
            return;
        }
        assert_eq!(
            resolve_dir_ci(root.path(), "VIEWS"),
            Some(root.path().join("Views"))
        );
    }

    #[test]
    fn test_missing_base_is_none() {
        assert_eq!(resolve_dir_ci(Path::new("/definitely/not/here"), "x"), None);
    }
}
