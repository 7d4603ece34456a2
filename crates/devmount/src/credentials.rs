//! Credential loading from a directory of shell scripts.
//!
//! Two script conventions are supported:
//! - multi-value scripts `export` several variables and are sourced by bash;
//!   everything they export is captured
//! - single-value scripts print one value; trimmed stdout is captured
//!
//! Scripts run in a scrubbed environment and the results land in a
//! [`CredentialSet`] that callers hand to child processes explicitly. The
//! current process environment is never modified.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use devmount_common::{CredentialSettings, DevmountError, DevmountResult};
use tokio::process::Command;

/// Variables bash sets on its own; never treated as exported by a script.
const SHELL_VARIABLES: &[&str] = &["PWD", "OLDPWD", "SHLVL", "_"];

/// Variables passed through to credential scripts.
const PASSTHROUGH: &[&str] = &["PATH", "HOME"];

/// Loaded credentials.
#[derive(Clone, Default)]
pub struct CredentialSet {
    source_dir: PathBuf,
    values: BTreeMap<String, String>,
}

impl CredentialSet {
    /// Directory the scripts were loaded from.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no variable is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// `(name, value)` pairs, for `Command::envs`.
    pub fn envs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("source_dir", &self.source_dir)
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Loads a [`CredentialSet`] from a script directory.
#[derive(Debug, Clone)]
pub struct CredentialLoader {
    dir: PathBuf,
    settings: CredentialSettings,
}

impl CredentialLoader {
    /// Create a loader for `dir`.
    pub fn new(dir: impl Into<PathBuf>, settings: CredentialSettings) -> Self {
        Self {
            dir: dir.into(),
            settings,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }

    /// Run every configured script and apply defaults.
    ///
    /// Missing scripts are skipped. A script that fails is logged and its
    /// variables stay unset (or fall back to defaults).
    pub async fn load(&self) -> CredentialSet {
        let mut set = CredentialSet {
            source_dir: self.dir.clone(),
            values: BTreeMap::new(),
        };

        if !self.dir.is_dir() {
            tracing::debug!(dir = %self.dir.display(), "No credential directory");
        }

        for name in &self.settings.multi_value {
            let script = self.dir.join(name);
            if !script.is_file() {
                tracing::debug!(script = %script.display(), "Credential script not found");
                continue;
            }
            match self.source(&script).await {
                Ok(exported) => {
                    tracing::debug!(script = %script.display(), count = exported.len(), "Sourced credential script");
                    for (key, value) in exported {
                        set.set(key, value);
                    }
                }
                Err(err) => tracing::warn!(error = %err, "Skipping credential script"),
            }
        }

        for (variable, name) in &self.settings.single_value {
            let script = self.dir.join(name);
            if !script.is_file() {
                tracing::debug!(script = %script.display(), "Credential script not found");
                continue;
            }
            match self.capture(&script).await {
                Ok(value) => set.set(variable.as_str(), value),
                Err(err) => tracing::warn!(%variable, error = %err, "Skipping credential script"),
            }
        }

        for (variable, default) in &self.settings.defaults {
            if set.get(variable).is_none() {
                tracing::debug!(%variable, "Using default credential");
                set.set(variable.as_str(), default.as_str());
            }
        }

        set
    }

    /// Source a multi-value script and return what it exported.
    ///
    /// # Errors
    ///
    /// Fails when bash cannot run, the script exits non-zero, or the
    /// timeout elapses.
    pub async fn source(&self, script: &Path) -> DevmountResult<BTreeMap<String, String>> {
        let mut command = scrubbed_bash();
        command
            .arg("-c")
            .arg(r#"source "$1" >/dev/null && env -0"#)
            .arg("bash")
            .arg(script);

        let stdout = self.run(command, script).await?;
        let inherited: BTreeMap<String, String> = PASSTHROUGH
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| ((*key).to_string(), v)))
            .collect();

        Ok(parse_env0(&stdout)
            .into_iter()
            .filter(|(key, _)| !SHELL_VARIABLES.contains(&key.as_str()))
            .filter(|(key, value)| inherited.get(key) != Some(value))
            .collect())
    }

    /// Execute a single-value script and return its trimmed stdout.
    ///
    /// # Errors
    ///
    /// Fails when the script exits non-zero, prints nothing, or the timeout
    /// elapses.
    pub async fn capture(&self, script: &Path) -> DevmountResult<String> {
        let mut command = scrubbed_bash();
        command.arg(script);

        let stdout = self.run(command, script).await?;
        let value = String::from_utf8_lossy(&stdout).trim().to_string();
        if value.is_empty() {
            return Err(DevmountError::CredentialScript {
                script: script.to_path_buf(),
                message: "produced no output".to_string(),
            });
        }
        Ok(value)
    }

    async fn run(&self, mut command: Command, script: &Path) -> DevmountResult<Vec<u8>> {
        let fail = |message: String| DevmountError::CredentialScript {
            script: script.to_path_buf(),
            message,
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout(), command.output())
            .await
            .map_err(|_| fail(format!("timed out after {}s", self.settings.timeout_secs)))?
            .map_err(|e| fail(format!("failed to run bash: {e}")))?;

        if !output.status.success() {
            return Err(fail(format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output.stdout)
    }
}

fn scrubbed_bash() -> Command {
    let mut command = Command::new("bash");
    command.env_clear();
    for key in PASSTHROUGH {
        if let Ok(value) = std::env::var(key) {
            command.env(key, value);
        }
    }
    command
}

/// Parse NUL-separated `KEY=VALUE` records as printed by `env -0`.
fn parse_env0(output: &[u8]) -> BTreeMap<String, String> {
    output
        .split(|b| *b == 0)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let record = String::from_utf8_lossy(record);
            let (key, value) = record.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn settings() -> CredentialSettings {
        CredentialSettings::default()
    }

    #[test]
    fn parse_env_records() {
        let parsed = parse_env0(b"A=1\0B=x=y\0\0C=\0");
        assert_eq!(parsed.get("A").map(String::as_str), Some("1"));
        assert_eq!(parsed.get("B").map(String::as_str), Some("x=y"));
        assert_eq!(parsed.get("C").map(String::as_str), Some(""));
    }

    #[tokio::test]
    async fn missing_directory_gives_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let set = CredentialLoader::new(temp.path().join("absent"), settings())
            .load()
            .await;

        assert_eq!(set.get("GITLAB_ADMIN_USER"), Some("root"));
        assert_eq!(set.get("GITLAB_ADMIN_PASS"), Some("changeme"));
        assert_eq!(set.get("GITLAB_PERSONAL_ACCESS_TOKEN"), None);
    }

    #[tokio::test]
    async fn sourced_values_beat_defaults() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("gitlab-admin.sh"),
            "#!/bin/bash\n# GitLab admin credentials\nexport GITLAB_ADMIN_USER=admin\nexport GITLAB_ADMIN_PASS='s3cret value'\nNOT_EXPORTED=1\necho noise\n",
        )
        .unwrap();

        let set = CredentialLoader::new(temp.path(), settings()).load().await;
        assert_eq!(set.get("GITLAB_ADMIN_USER"), Some("admin"));
        assert_eq!(set.get("GITLAB_ADMIN_PASS"), Some("s3cret value"));
        assert_eq!(set.get("NOT_EXPORTED"), None);
        assert_eq!(set.get("PWD"), None);
    }

    #[tokio::test]
    async fn single_value_is_trimmed() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("gitlab-personal-access-token.sh"),
            "#!/bin/bash\necho '  glpat-abc123  '\n",
        )
        .unwrap();

        let set = CredentialLoader::new(temp.path(), settings()).load().await;
        assert_eq!(set.get("GITLAB_PERSONAL_ACCESS_TOKEN"), Some("glpat-abc123"));
    }

    #[tokio::test]
    async fn failing_script_leaves_variable_unset() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("gitlab-personal-access-token.sh"),
            "#!/bin/bash\necho partial\nexit 3\n",
        )
        .unwrap();

        let loader = CredentialLoader::new(temp.path(), settings());
        let err = loader
            .capture(&temp.path().join("gitlab-personal-access-token.sh"))
            .await
            .unwrap_err();
        assert!(matches!(err, DevmountError::CredentialScript { .. }));

        let set = loader.load().await;
        assert_eq!(set.get("GITLAB_PERSONAL_ACCESS_TOKEN"), None);
    }

    #[tokio::test]
    async fn slow_script_times_out() {
        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("slow.sh");
        fs::write(&script, "#!/bin/bash\nsleep 10\necho late\n").unwrap();

        let loader = CredentialLoader::new(
            temp.path(),
            CredentialSettings {
                timeout_secs: 1,
                ..settings()
            },
        );
        let err = loader.capture(&script).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn debug_hides_values() {
        let mut set = CredentialSet::default();
        set.set("TOKEN", "glpat-secret");
        let debug = format!("{set:?}");
        assert!(debug.contains("TOKEN"));
        assert!(!debug.contains("glpat-secret"));
    }
}
