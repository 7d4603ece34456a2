//! Standard filesystem paths for a devmount plugin.

use std::path::PathBuf;

use once_cell::sync::Lazy;

/// Environment variable naming the directory that holds credential scripts.
pub const CREDENTIAL_DIR_ENV: &str = "CREDENTIAL_SCRIPT_DIR";

/// Name of the staged file tree inside the plugin root.
pub const MOUNTED_FILES_DIR: &str = "mounted-files";

/// Placeholder kept in empty directories; never mounted.
pub const DEFAULT_SENTINEL: &str = ".gitkeep";

/// Where the symlink recreation script is written unless configured otherwise.
pub const DEFAULT_SYMLINK_SCRIPT: &str = "/tmp/devmount-symlinks.sh";

/// Compose service receiving the generated volumes unless configured otherwise.
pub const DEFAULT_SERVICE: &str = "dev";

/// Default plugin root directory.
pub static PLUGIN_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("DEVMOUNT_PLUGIN_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
});

/// Default root of the repository hosting the compose project.
pub static REPO_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("DEVMOUNT_REPO_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
});

/// Standard paths used by the pre-up hook.
#[derive(Debug, Clone)]
pub struct PluginPaths {
    /// Plugin root (holds `mounted-files/`, `templates/`, `hooks/`).
    pub plugin_root: PathBuf,
    /// Repository root (holds the compose project).
    pub repo_root: PathBuf,
}

impl PluginPaths {
    /// Create paths with default locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create paths for an explicit plugin and repository root.
    #[must_use]
    pub fn with_roots(plugin_root: impl Into<PathBuf>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            plugin_root: plugin_root.into(),
            repo_root: repo_root.into(),
        }
    }

    /// Tree of files staged for mounting.
    #[must_use]
    pub fn mounted_files(&self) -> PathBuf {
        self.plugin_root.join(MOUNTED_FILES_DIR)
    }

    /// Template directory.
    #[must_use]
    pub fn templates(&self) -> PathBuf {
        self.plugin_root.join("templates")
    }

    /// Compose override template.
    #[must_use]
    pub fn override_template(&self) -> PathBuf {
        self.templates()
            .join("docker-compose.override.yml.template")
    }

    /// Hook directory.
    #[must_use]
    pub fn hooks(&self) -> PathBuf {
        self.plugin_root.join("hooks")
    }

    /// Install and helper scripts.
    #[must_use]
    pub fn hook_scripts(&self) -> PathBuf {
        self.hooks().join("scripts")
    }

    /// Optional plugin configuration file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.plugin_root.join("devmount.toml")
    }

    /// Directory holding the compose project.
    #[must_use]
    pub fn dev_environment(&self) -> PathBuf {
        self.repo_root.join("dev-environment")
    }

    /// Generated compose override.
    #[must_use]
    pub fn override_output(&self) -> PathBuf {
        self.dev_environment().join("docker-compose.override.yml")
    }
}

impl Default for PluginPaths {
    fn default() -> Self {
        Self {
            plugin_root: PLUGIN_ROOT.clone(),
            repo_root: REPO_ROOT.clone(),
        }
    }
}

/// Credential script directory: `$CREDENTIAL_SCRIPT_DIR`, falling back to
/// `<config dir>/devmount/credentials`.
#[must_use]
pub fn default_credentials_dir() -> PathBuf {
    std::env::var(CREDENTIAL_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("devmount")
                .join("credentials")
        })
}
