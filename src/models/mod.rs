//! Data model shared by the inventory readers, the comparator and the
//! executors.
//!
//! CDN-side records are read-only snapshots; CMS-side records are only ever
//! changed through a [`action::ReconciliationAction`].

pub mod action;
pub mod asset;
pub mod folder;
pub mod media;

/// Canonical `/`-delimited form of a folder path: no leading, trailing or
/// doubled separators, backslashes treated as separators.
pub fn normalize_path(raw: &str) -> String {
    raw.trim()
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Express `path` relative to `root`. Returns `Some("")` for the root itself
/// and `None` when `path` lies outside it.
pub fn relative_to(root: &str, path: &str) -> Option<String> {
    let root = normalize_path(root);
    let path = normalize_path(path);
    if root.is_empty() {
        return Some(path);
    }
    if path == root {
        return Some(String::new());
    }
    path.strip_prefix(&format!("{}/", root))
        .map(|rest| rest.to_string())
}

/// Whether `path` is `scope` or lies beneath it.
pub fn within(scope: &str, path: &str) -> bool {
    scope.is_empty() || path == scope || path.starts_with(&format!("{}/", scope))
}

/// Number of segments in a normalized relative path (`""` is depth 0).
pub fn depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('/').count()
    }
}

/// Parent of a normalized relative path (`"a/b"` -> `"a"`, `"a"` -> `""`).
pub fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}
