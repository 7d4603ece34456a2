//! Common error types for devmount.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`DevmountError`].
pub type DevmountResult<T> = Result<T, DevmountError>;

/// Common errors across devmount.
#[derive(Error, Diagnostic, Debug)]
pub enum DevmountError {
    /// The compose override could not be written.
    #[error("Failed to write override document {}: {source}", .path.display())]
    #[diagnostic(
        code(devmount::override_doc::write),
        help("The destination directory must exist before the pre-up hook runs")
    )]
    OverrideWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The symlink recreation script could not be written.
    #[error("Failed to write symlink script {}: {source}", .path.display())]
    #[diagnostic(code(devmount::symlink_script::write))]
    ScriptWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The override template is not a usable compose document.
    #[error("Invalid override template: {message}")]
    #[diagnostic(
        code(devmount::override_doc::invalid_template),
        help("The template must be a YAML mapping with a `services` mapping at the top level")
    )]
    InvalidTemplate {
        /// What was wrong with the template.
        message: String,
    },

    /// A credential script failed to run.
    #[error("Credential script {} failed: {message}", .script.display())]
    #[diagnostic(code(devmount::credentials::script))]
    CredentialScript {
        /// Path of the script.
        script: PathBuf,
        /// The error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(devmount::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(devmount::serialization))]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(devmount::config))]
    Config {
        /// The error message.
        message: String,
    },
}

impl From<serde_yaml::Error> for DevmountError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DevmountError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
