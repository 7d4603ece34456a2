//! # devmount
//!
//! Pre-up companion for development-container plugins.
//!
//! devmount provides:
//! - Permission-driven bind mounts for every file staged under `mounted-files/`
//! - Containment checks for staged symlinks and a script that recreates the
//!   safe ones inside the container
//! - A compose override document merging the generated mounts into a template
//! - Credential loading from script directories into an explicit value
//! - Hygiene checks for plugin shell scripts

#![warn(missing_docs)]

pub mod cli;
pub mod compose;
pub mod credentials;
pub mod hook;
pub mod lint;
pub mod mode;
pub mod paths;
pub mod script;
pub mod symlink;
pub mod tree;

pub use compose::OverrideDocument;
pub use credentials::{CredentialLoader, CredentialSet};
pub use hook::{HookReport, PreUpHook};
pub use mode::MountMode;
pub use symlink::{InvalidReason, SymlinkCandidate, Validity, validate_symlink};
pub use tree::{MountEntry, TreeScan, generate_mounts, scan_symlinks, scan_tree};
