//! Plugin configuration (`devmount.toml`).
//!
//! Every key is optional. A plugin without the file gets the built-in
//! defaults; command-line flags override whatever is loaded here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DevmountResult;
use crate::paths::{DEFAULT_SENTINEL, DEFAULT_SERVICE, DEFAULT_SYMLINK_SCRIPT};

/// Plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    /// Compose service whose volume list receives the generated mounts.
    #[serde(default = "default_service")]
    pub service: String,

    /// File name skipped during mount generation.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    /// Destination of the symlink recreation script.
    #[serde(default = "default_symlink_script")]
    pub symlink_script: PathBuf,

    /// Destination of the compose override. Derived from the repository root
    /// when unset.
    #[serde(default)]
    pub override_output: Option<PathBuf>,

    /// Credential loading.
    #[serde(default)]
    pub credentials: CredentialSettings,
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}

fn default_symlink_script() -> PathBuf {
    PathBuf::from(DEFAULT_SYMLINK_SCRIPT)
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            sentinel: default_sentinel(),
            symlink_script: default_symlink_script(),
            override_output: None,
            credentials: CredentialSettings::default(),
        }
    }
}

/// Which credential scripts to load and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialSettings {
    /// Scripts sourced for every variable they export.
    #[serde(default = "default_multi_value")]
    pub multi_value: Vec<String>,

    /// Variable name to script whose trimmed stdout is the value.
    #[serde(default = "default_single_value")]
    pub single_value: BTreeMap<String, String>,

    /// Fallbacks for variables no script provided.
    #[serde(default = "default_credential_defaults")]
    pub defaults: BTreeMap<String, String>,

    /// Upper bound for a single script run.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_multi_value() -> Vec<String> {
    vec!["gitlab-admin.sh".to_string()]
}

fn default_single_value() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "GITLAB_PERSONAL_ACCESS_TOKEN".to_string(),
        "gitlab-personal-access-token.sh".to_string(),
    )])
}

fn default_credential_defaults() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("GITLAB_ADMIN_USER".to_string(), "root".to_string()),
        ("GITLAB_ADMIN_PASS".to_string(), "changeme".to_string()),
    ])
}

const fn default_timeout_secs() -> u64 {
    5
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            multi_value: default_multi_value(),
            single_value: default_single_value(),
            defaults: default_credential_defaults(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PluginConfig {
    /// Parse from TOML.
    pub fn from_toml(content: &str) -> DevmountResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> DevmountResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No plugin config, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), service = %config.service, "Loaded plugin config");
        Ok(config)
    }
}
