//! # devmount-common
//!
//! Shared utilities and types for devmount.
//!
//! This crate provides common functionality used across devmount crates:
//! - Standard plugin and repository paths
//! - The optional `devmount.toml` plugin configuration
//! - Common error types

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod paths;

pub use config::{CredentialSettings, PluginConfig};
pub use error::{DevmountError, DevmountResult};
pub use paths::PluginPaths;
