//! devmount CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, bail};
use devmount_common::paths::default_credentials_dir;
use devmount_common::{PluginConfig, PluginPaths};

use crate::credentials::CredentialLoader;
use crate::hook::PreUpHook;
use crate::lint::lint_dir;
use crate::paths::absolute;
use crate::symlink::{Validity, validate_symlink};
use crate::tree::generate_mounts;

/// devmount - Auto-mounts and safe symlinks for dev containers
#[derive(Parser)]
#[command(name = "devmount")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Plugin root (contains mounted-files/, templates/, hooks/)
    #[arg(long, env = "DEVMOUNT_PLUGIN_ROOT", default_value = ".", global = true)]
    pub plugin_root: PathBuf,

    /// Repository root hosting the compose project
    #[arg(long, env = "DEVMOUNT_REPO_ROOT", default_value = ".", global = true)]
    pub repo_root: PathBuf,

    /// Plugin config file (default: <plugin-root>/devmount.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// YAML document.
    Yaml,
}

/// devmount commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Write the compose override and the symlink script (pre-up hook)
    Generate {
        /// Compose service receiving the volumes
        #[arg(long)]
        service: Option<String>,

        /// Override destination
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Symlink script destination
        #[arg(long)]
        symlink_script: Option<PathBuf>,

        /// File name excluded from mounting
        #[arg(long)]
        sentinel: Option<String>,
    },

    /// Print the generated mount list without writing anything
    Mounts {
        /// File name excluded from mounting
        #[arg(long)]
        sentinel: Option<String>,
    },

    /// Check whether a symlink is safe to recreate
    CheckSymlink {
        /// The symlink
        link: PathBuf,

        /// Tree the link must stay inside (default: <plugin-root>/mounted-files)
        #[arg(long)]
        base: Option<PathBuf>,
    },

    /// Load credentials; list their names or run a command with them
    Credentials {
        /// Credential script directory
        #[arg(long, env = "CREDENTIAL_SCRIPT_DIR")]
        dir: Option<PathBuf>,

        /// Command to run with the credentials in its environment
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Check plugin shell scripts for shebang, strict mode and syntax
    Lint {
        /// Directory to scan (default: <plugin-root>/hooks)
        dir: Option<PathBuf>,
    },
}

impl Cli {
    fn paths(&self) -> PluginPaths {
        PluginPaths::with_roots(&self.plugin_root, &self.repo_root)
    }

    fn load_config(&self, paths: &PluginPaths) -> Result<PluginConfig> {
        let path = self.config.clone().unwrap_or_else(|| paths.config_file());
        Ok(PluginConfig::load_or_default(&path)?)
    }

    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let paths = self.paths();
        let mut config = self.load_config(&paths)?;

        match self.command {
            Commands::Generate {
                service,
                output,
                symlink_script,
                sentinel,
            } => {
                if let Some(service) = service {
                    config.service = service;
                }
                if let Some(output) = output {
                    config.override_output = Some(output);
                }
                if let Some(script) = symlink_script {
                    config.symlink_script = script;
                }
                if let Some(sentinel) = sentinel {
                    config.sentinel = sentinel;
                }

                let report = PreUpHook::new(paths, config).run()?;
                match self.format {
                    OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
                    OutputFormat::Text => {
                        println!(
                            "{} mounts ({} rw, {} ro) -> {}",
                            report.mounts,
                            report.rw,
                            report.ro,
                            report.override_path.display()
                        );
                        println!(
                            "{} symlinks ({} skipped) -> {}",
                            report.symlinks,
                            report.skipped_symlinks,
                            report.script_path.display()
                        );
                    }
                }
            }

            Commands::Mounts { sentinel } => {
                let sentinel = sentinel.unwrap_or(config.sentinel);
                let mounts = generate_mounts(&paths.mounted_files(), &sentinel)?;
                match self.format {
                    OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&mounts)?),
                    OutputFormat::Text => {
                        for entry in &mounts {
                            println!("{entry}");
                        }
                    }
                }
            }

            Commands::CheckSymlink { link, base } => {
                let base = absolute(&base.unwrap_or_else(|| paths.mounted_files()))?;
                let link = absolute(&link)?;
                let candidate = validate_symlink(&link, &base)?;
                match candidate.validity {
                    Validity::Valid => println!("valid"),
                    Validity::Invalid(reason) => println!("invalid: {reason}"),
                }
            }

            Commands::Credentials { dir, command } => {
                let dir = dir.unwrap_or_else(default_credentials_dir);
                let credentials = CredentialLoader::new(dir, config.credentials).load().await;

                if let Some((program, args)) = command.split_first() {
                    tracing::debug!(%program, count = credentials.len(), "Running with credentials");
                    let status = tokio::process::Command::new(program)
                        .args(args)
                        .envs(credentials.envs())
                        .status()
                        .await?;
                    if !status.success() {
                        bail!("{program} exited with {status}");
                    }
                } else {
                    println!("{}", credentials.source_dir().display());
                    for name in credentials.names() {
                        println!("  {name}");
                    }
                }
            }

            Commands::Lint { dir } => {
                let dir = dir.unwrap_or_else(|| paths.hooks());
                let reports = lint_dir(&dir)?;
                let failed = reports.iter().filter(|r| !r.is_clean()).count();

                match self.format {
                    OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&reports)?),
                    OutputFormat::Text => {
                        for report in &reports {
                            if report.is_clean() {
                                println!("ok    {}", report.path.display());
                            }
                            for finding in &report.findings {
                                println!("FAIL  {}: {finding}", report.path.display());
                            }
                        }
                    }
                }

                if failed > 0 {
                    bail!("{failed} of {} scripts failed lint", reports.len());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trailing_command_captured() {
        let cli = Cli::try_parse_from([
            "devmount",
            "credentials",
            "--dir",
            "/creds",
            "docker",
            "compose",
            "up",
        ])
        .unwrap();

        match cli.command {
            Commands::Credentials { dir, command } => {
                assert_eq!(dir, Some(PathBuf::from("/creds")));
                assert_eq!(command, vec!["docker", "compose", "up"]);
            }
            _ => panic!("expected credentials command"),
        }
    }
}
