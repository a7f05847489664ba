//! Lexical path normalization.

use std::path::{Component, Path, PathBuf};

/// Fold `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root, matching how Node's `path.resolve`
/// treats it. Symlinks are not resolved.
///
/// # Example
///
/// ```
/// use pkgraph_specifier::normalize_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(
///     normalize_path(Path::new("/repo/packages/app/../lib/./src")),
///     PathBuf::from("/repo/packages/lib/src"),
/// );
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) && normalized.pop();
                if !popped && !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}

/// Resolve `relative` against `base` and normalize the result.
pub(crate) fn resolve_against(base: &Path, relative: &str) -> PathBuf {
    let expanded = match relative.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => None,
    };

    let joined = match expanded {
        Some(path) => path,
        None => base.join(relative),
    };

    normalize_path(&joined)
}
