//! Host-to-container path mapping.

use std::path::{Component, Path, PathBuf};

/// Fold `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root, so `/a/../../b` becomes `/b`.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => result.push(prefix.as_os_str()),
            Component::RootDir => result.push("/"),
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(name) => result.push(name),
        }
    }

    if result.as_os_str().is_empty() && path.has_root() {
        result.push("/");
    }

    result
}

/// Absolute, lexically normalized form of `path`. Symlinks are not resolved.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    Ok(normalize(&std::path::absolute(path)?))
}

/// Map a host path under `base` onto its container path.
///
/// Returns `None` when `host_path` is not inside `base`. The result always
/// starts with `/`.
#[must_use]
pub fn to_container_path(base: &Path, host_path: &Path) -> Option<PathBuf> {
    let relative = host_path.strip_prefix(base).ok()?;
    Some(Path::new("/").join(relative))
}
