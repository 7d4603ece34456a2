//! Symlink containment checks.
//!
//! Symlinks under the staged tree are recreated inside the container by a
//! generated script. A link is only recreated when it is relative, stays
//! inside the tree once resolved, and points at something that exists.
//! Anything else could expose host paths outside the tree.

use std::fmt;
use std::path::{Path, PathBuf};

use devmount_common::DevmountResult;

use crate::paths::{normalize, to_container_path};

/// Why a symlink was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Link text is an absolute path.
    AbsoluteTarget,
    /// Resolved target lies outside the tree base.
    EscapesTree,
    /// Nothing exists at the resolved target.
    TargetMissing,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AbsoluteTarget => "absolute target",
            Self::EscapesTree => "escapes tree",
            Self::TargetMissing => "target missing",
        })
    }
}

/// Outcome of validating one symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Safe to recreate.
    Valid,
    /// Rejected.
    Invalid(InvalidReason),
}

/// A symlink discovered under the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkCandidate {
    /// Path of the link itself.
    pub link_path: PathBuf,
    /// Unresolved link text.
    pub raw_target: PathBuf,
    /// Target resolved against the link's directory. `None` for absolute
    /// link text, which is rejected before resolution.
    pub resolved_target: Option<PathBuf>,
    /// Validation result.
    pub validity: Validity,
}

impl SymlinkCandidate {
    /// Whether the link may be recreated.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self.validity, Validity::Valid)
    }

    /// Container-side path of the link.
    #[must_use]
    pub fn container_link(&self, tree_base: &Path) -> Option<PathBuf> {
        to_container_path(&normalize(tree_base), &self.link_path)
    }

    /// Container-side path of the resolved target.
    #[must_use]
    pub fn container_target(&self, tree_base: &Path) -> Option<PathBuf> {
        let resolved = self.resolved_target.as_deref()?;
        to_container_path(&normalize(tree_base), resolved)
    }
}

/// Validate the symlink at `link_path` against `tree_base`.
///
/// Both paths should be absolute. Containment is checked twice: lexically,
/// with `.` and `..` folded against the link's directory, and then with the
/// target's parent directory canonicalized, so an intermediate symlink
/// cannot lead outside the tree. The final component is never followed.
///
/// # Errors
///
/// Returns an error when the link text cannot be read.
pub fn validate_symlink(link_path: &Path, tree_base: &Path) -> DevmountResult<SymlinkCandidate> {
    let link_path = normalize(link_path);
    let tree_base = normalize(tree_base);
    let raw_target = std::fs::read_link(&link_path)?;

    let candidate = |resolved_target, validity| SymlinkCandidate {
        link_path: link_path.clone(),
        raw_target: raw_target.clone(),
        resolved_target,
        validity,
    };

    if raw_target.has_root() {
        return Ok(candidate(
            None,
            Validity::Invalid(InvalidReason::AbsoluteTarget),
        ));
    }

    let link_dir = link_path.parent().unwrap_or_else(|| Path::new("/"));
    let resolved = normalize(&link_dir.join(&raw_target));

    if !resolved.starts_with(&tree_base) {
        return Ok(candidate(
            Some(resolved),
            Validity::Invalid(InvalidReason::EscapesTree),
        ));
    }

    if let Some(reason) = parent_escape(&resolved, &tree_base) {
        return Ok(candidate(Some(resolved), Validity::Invalid(reason)));
    }

    if std::fs::symlink_metadata(&resolved).is_err() {
        return Ok(candidate(
            Some(resolved),
            Validity::Invalid(InvalidReason::TargetMissing),
        ));
    }

    Ok(candidate(Some(resolved), Validity::Valid))
}

/// Check where the target's parent really lives once intermediate links
/// are followed.
fn parent_escape(resolved: &Path, tree_base: &Path) -> Option<InvalidReason> {
    if resolved == tree_base {
        return None;
    }
    let parent = resolved.parent()?;
    let Ok(real_parent) = std::fs::canonicalize(parent) else {
        return Some(InvalidReason::TargetMissing);
    };
    let real_base = std::fs::canonicalize(tree_base).ok()?;

    if real_parent.starts_with(&real_base) {
        None
    } else {
        Some(InvalidReason::EscapesTree)
    }
}
