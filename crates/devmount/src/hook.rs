//! Pre-up hook: regenerate the compose override and the symlink script.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use devmount_common::{DevmountError, DevmountResult, PluginConfig, PluginPaths};
use serde::Serialize;

use crate::compose::OverrideDocument;
use crate::script::render_symlink_script;
use crate::tree::scan_tree;

/// What a hook run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookReport {
    /// Total mounts written.
    pub mounts: usize,
    /// Mounts with mode `rw`.
    pub rw: usize,
    /// Mounts with mode `ro`.
    pub ro: usize,
    /// Symlinks written to the script.
    pub symlinks: usize,
    /// Symlinks rejected by validation.
    pub skipped_symlinks: usize,
    /// Override destination.
    pub override_path: PathBuf,
    /// Script destination.
    pub script_path: PathBuf,
}

/// Pre-up hook for one plugin.
#[derive(Debug, Clone)]
pub struct PreUpHook {
    paths: PluginPaths,
    config: PluginConfig,
}

impl PreUpHook {
    /// Create a hook from resolved paths and configuration.
    #[must_use]
    pub const fn new(paths: PluginPaths, config: PluginConfig) -> Self {
        Self { paths, config }
    }

    /// Override destination: configured path or the repository default.
    #[must_use]
    pub fn override_path(&self) -> PathBuf {
        self.config
            .override_output
            .clone()
            .unwrap_or_else(|| self.paths.override_output())
    }

    /// Script destination.
    #[must_use]
    pub fn script_path(&self) -> &Path {
        &self.config.symlink_script
    }

    /// Scan the staged tree once and write both artifacts.
    ///
    /// # Errors
    ///
    /// Fails when the template is unreadable or malformed, or when either
    /// artifact cannot be written. Per-file problems inside the tree are
    /// logged and skipped instead.
    pub fn run(&self) -> DevmountResult<HookReport> {
        let tree = self.paths.mounted_files();
        tracing::info!(tree = %tree.display(), service = %self.config.service, "Generating auto-mounts");

        let scan = scan_tree(&tree, &self.config.sentinel)?;

        let template_path = self.paths.override_template();
        let template = if template_path.exists() {
            Some(fs::read_to_string(&template_path)?)
        } else {
            tracing::debug!(path = %template_path.display(), "No override template, starting empty");
            None
        };

        let document =
            OverrideDocument::render(template.as_deref(), &self.config.service, &scan.mounts)?;
        let override_path = self.override_path();
        write_override(&override_path, &document)?;

        let script = render_symlink_script(&scan.symlinks, &scan.base);
        let script_path = self.script_path().to_path_buf();
        write_script(&script_path, &script)?;

        let rw = scan.rw_count();
        let symlinks = scan.valid_symlinks().count();
        let report = HookReport {
            mounts: scan.mounts.len(),
            rw,
            ro: scan.mounts.len() - rw,
            symlinks,
            skipped_symlinks: scan.symlinks.len() - symlinks,
            override_path,
            script_path,
        };

        tracing::info!(
            mounts = report.mounts,
            rw = report.rw,
            ro = report.ro,
            symlinks = report.symlinks,
            skipped_symlinks = report.skipped_symlinks,
            "Auto-mounts generated"
        );
        Ok(report)
    }
}

/// The destination directory belongs to the compose project and is never
/// created here.
fn write_override(path: &Path, content: &str) -> DevmountResult<()> {
    fs::write(path, content).map_err(|source| DevmountError::OverrideWrite {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Wrote override document");
    Ok(())
}

fn write_script(path: &Path, content: &str) -> DevmountResult<()> {
    let wrap = |source| DevmountError::ScriptWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, content).map_err(wrap)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(wrap)?;
    tracing::debug!(path = %path.display(), "Wrote symlink script");
    Ok(())
}
