//! Staged-tree traversal.
//!
//! One walk over `mounted-files/` yields both the bind mounts for every
//! regular file and the validated symlinks. Siblings are visited in file-name
//! order so repeated runs over an unchanged tree produce identical output.

use std::fmt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use devmount_common::DevmountResult;
use serde::Serialize;
use walkdir::WalkDir;

use crate::mode::MountMode;
use crate::paths::{absolute, to_container_path};
use crate::symlink::{SymlinkCandidate, Validity, validate_symlink};

/// One file staged for mounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountEntry {
    /// Absolute host path of the file.
    pub host_path: PathBuf,
    /// Path inside the container, always rooted at `/`.
    pub container_path: PathBuf,
    /// Mount mode derived from the file's permission bits.
    pub mode: MountMode,
}

impl MountEntry {
    /// Compose short-syntax volume string (`host:container:mode`).
    #[must_use]
    pub fn to_volume(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.host_path.display(),
            self.container_path.display(),
            self.mode
        )
    }
}

/// Result of one walk over the staged tree.
#[derive(Debug, Clone, Default)]
pub struct TreeScan {
    /// Absolute tree base the paths were derived from.
    pub base: PathBuf,
    /// Mount entries in traversal order.
    pub mounts: Vec<MountEntry>,
    /// Every symlink found, valid or not, in traversal order.
    pub symlinks: Vec<SymlinkCandidate>,
}

impl TreeScan {
    /// Symlinks that passed validation.
    pub fn valid_symlinks(&self) -> impl Iterator<Item = &SymlinkCandidate> {
        self.symlinks.iter().filter(|candidate| candidate.is_valid())
    }

    /// Number of `rw` mounts.
    #[must_use]
    pub fn rw_count(&self) -> usize {
        self.mounts
            .iter()
            .filter(|entry| entry.mode == MountMode::Rw)
            .count()
    }
}

/// Walk `base_dir` once, collecting mounts and symlinks.
///
/// A missing tree is not an error and yields an empty scan. Entries whose
/// metadata or link text cannot be read are skipped with a warning, as are
/// paths that cannot be written into a volume string or the link script.
///
/// # Errors
///
/// Returns an error only when `base_dir` cannot be made absolute.
pub fn scan_tree(base_dir: &Path, sentinel: &str) -> DevmountResult<TreeScan> {
    let base = absolute(base_dir)?;
    let mut scan = TreeScan {
        base: base.clone(),
        ..TreeScan::default()
    };

    if !base.is_dir() {
        tracing::debug!(base = %base.display(), "No staged tree, nothing to mount");
        return Ok(scan);
    }

    let walker = WalkDir::new(&base)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(path = ?err.path(), error = %err, "Skipping unreadable entry");
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            match validate_symlink(entry.path(), &base) {
                Ok(candidate) => {
                    let resolved = candidate.resolved_target.as_deref();
                    let unprintable = std::iter::once(candidate.link_path.as_path())
                        .chain(resolved)
                        .any(|path| path.to_str().is_none());
                    if unprintable {
                        tracing::warn!(
                            link = %candidate.link_path.display(),
                            reason = "path is not valid UTF-8",
                            "Skipping symlink"
                        );
                        continue;
                    }
                    if let Validity::Invalid(reason) = candidate.validity {
                        tracing::warn!(
                            link = %candidate.link_path.display(),
                            target = %candidate.raw_target.display(),
                            %reason,
                            "Skipping symlink"
                        );
                    }
                    scan.symlinks.push(candidate);
                }
                Err(err) => {
                    tracing::warn!(link = %entry.path().display(), error = %err, "Skipping unreadable symlink");
                }
            }
            continue;
        }

        if !file_type.is_file() {
            continue;
        }

        if entry.file_name() == sentinel {
            continue;
        }

        if let Some(reason) = volume_unsafe(entry.path()) {
            tracing::warn!(path = %entry.path().display(), reason, "Skipping file");
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(
                    path = %entry.path().display(),
                    error = %err,
                    "Skipping file, permission unreadable"
                );
                continue;
            }
        };

        let Some(container_path) = to_container_path(&base, entry.path()) else {
            continue;
        };

        let mode = MountMode::from_permissions(metadata.permissions().mode());
        tracing::debug!(
            host = %entry.path().display(),
            container = %container_path.display(),
            %mode,
            "Mount"
        );

        scan.mounts.push(MountEntry {
            host_path: entry.path().to_path_buf(),
            container_path,
            mode,
        });
    }

    Ok(scan)
}

/// Why `path` cannot appear in a `host:container:mode` string, if anything.
fn volume_unsafe(path: &Path) -> Option<&'static str> {
    match path.to_str() {
        None => Some("path is not valid UTF-8"),
        Some(text) if text.contains(':') => Some("path contains ':'"),
        Some(_) => None,
    }
}

/// Mount entries for every regular file under `base_dir`.
///
/// # Errors
///
/// See [`scan_tree`].
pub fn generate_mounts(base_dir: &Path, sentinel: &str) -> DevmountResult<Vec<MountEntry>> {
    Ok(scan_tree(base_dir, sentinel)?.mounts)
}

/// Every symlink under `base_dir`, validated.
///
/// # Errors
///
/// See [`scan_tree`].
pub fn scan_symlinks(base_dir: &Path, sentinel: &str) -> DevmountResult<Vec<SymlinkCandidate>> {
    Ok(scan_tree(base_dir, sentinel)?.symlinks)
}
