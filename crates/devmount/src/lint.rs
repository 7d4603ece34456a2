//! Hygiene checks for plugin hook and install scripts.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use devmount_common::DevmountResult;
use serde::Serialize;
use walkdir::WalkDir;

const SHEBANG: &str = "#!/bin/bash";
const STRICT_MODE: &str = "set -euo pipefail";

/// A problem found in a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LintFinding {
    /// First line is not `#!/bin/bash`.
    MissingShebang,
    /// `set -euo pipefail` does not appear.
    MissingStrictMode,
    /// `bash -n` rejected the script.
    SyntaxError {
        /// Diagnostic printed by bash.
        message: String,
    },
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingShebang => write!(f, "must start with {SHEBANG}"),
            Self::MissingStrictMode => write!(f, "must enable strict mode ({STRICT_MODE})"),
            Self::SyntaxError { message } => write!(f, "syntax error: {message}"),
        }
    }
}

/// Findings for one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    /// Script path.
    pub path: PathBuf,
    /// Empty when the script passed.
    pub findings: Vec<LintFinding>,
}

impl ScriptReport {
    /// Whether the script passed every check.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Lint a single script.
///
/// # Errors
///
/// Fails when the script cannot be read or bash cannot be started.
pub fn lint_script(path: &Path) -> DevmountResult<ScriptReport> {
    let content = std::fs::read_to_string(path)?;
    let mut findings = Vec::new();

    if content.lines().next().map(str::trim_end) != Some(SHEBANG) {
        findings.push(LintFinding::MissingShebang);
    }

    if !content.lines().any(|line| line.trim() == STRICT_MODE) {
        findings.push(LintFinding::MissingStrictMode);
    }

    let output = Command::new("bash").arg("-n").arg(path).output()?;
    if !output.status.success() {
        findings.push(LintFinding::SyntaxError {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    if !findings.is_empty() {
        tracing::debug!(path = %path.display(), count = findings.len(), "Script has findings");
    }

    Ok(ScriptReport {
        path: path.to_path_buf(),
        findings,
    })
}

/// Lint every `*.sh` file under `dir`, in path order. A missing directory
/// yields no reports.
///
/// # Errors
///
/// See [`lint_script`].
pub fn lint_dir(dir: &Path) -> DevmountResult<Vec<ScriptReport>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sh"))
        .map(|entry| lint_script(entry.path()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn clean_script_passes() {
        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("install-tool.sh");
        fs::write(&script, "#!/bin/bash\nset -euo pipefail\necho ok\n").unwrap();

        assert!(lint_script(&script).unwrap().is_clean());
    }

    #[test]
    fn flags_shebang_and_strict_mode() {
        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("loose.sh");
        fs::write(&script, "#!/bin/sh\necho ok\n").unwrap();

        let report = lint_script(&script).unwrap();
        assert_eq!(
            report.findings,
            vec![LintFinding::MissingShebang, LintFinding::MissingStrictMode]
        );
    }

    #[test]
    fn flags_syntax_error() {
        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("broken.sh");
        fs::write(&script, "#!/bin/bash\nset -euo pipefail\nif true; then\n").unwrap();

        let report = lint_script(&script).unwrap();
        assert!(matches!(
            report.findings.as_slice(),
            [LintFinding::SyntaxError { .. }]
        ));
    }

    #[test]
    fn dir_lints_only_shell_scripts() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.sh"), "#!/bin/bash\nset -euo pipefail\n").unwrap();
        fs::write(temp.path().join("a.sh"), "echo\n").unwrap();
        fs::write(temp.path().join("README.md"), "# docs\n").unwrap();

        let reports = lint_dir(temp.path()).unwrap();
        let names: Vec<_> = reports
            .iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.sh", "b.sh"]);
        assert!(!reports[0].is_clean());
        assert!(reports[1].is_clean());
    }
}
