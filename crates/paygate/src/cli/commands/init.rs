//! # Init Command
//!
//! `paygate init` writes the commented default configuration:
//!
//! ```text
//! ~/.paygate/
//! ├── config.toml       (0600)
//! └── accounts/         (0700, created on first use)
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use paygate_core::config::Config;
use paygate_core::config_loader::ConfigLoader;
use paygate_core::error::ConfigError;

/// Errors that can occur during initialization.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// A configuration file exists and `--force` was not given.
    #[error("{0} already exists. Use --force to overwrite it.")]
    AlreadyInitialized(String),

    /// The default location could not be determined.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The file or its directory could not be written.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The `paygate init` command handler.
#[derive(Debug, Clone)]
pub struct InitCommand {
    /// Overwrite an existing configuration file.
    pub force: bool,
    /// Target file; `~/.paygate/config.toml` when absent.
    pub config_path: Option<PathBuf>,
}

impl InitCommand {
    /// Create a new `InitCommand`.
    #[must_use]
    pub const fn new(force: bool, config_path: Option<PathBuf>) -> Self {
        Self { force, config_path }
    }

    /// Write the configuration file and print next steps.
    ///
    /// # Errors
    ///
    /// Returns [`InitError`] if the file exists (without `--force`) or
    /// cannot be written.
    pub fn run(&self) -> Result<(), InitError> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => ConfigLoader::new()?.config_path(),
        };

        self.write_config(&path)?;

        println!("Wrote {}", path.display());
        println!();
        println!("Next steps:");
        println!("  paygate account create <NAME> --limit <SATOSHIS>");
        println!("  paygate serve");
        Ok(())
    }

    /// Write the default configuration to `path`.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn write_config(&self, path: &Path) -> Result<(), InitError> {
        if path.exists() && !self.force {
            return Err(InitError::AlreadyInitialized(path.display().to_string()));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, Config::default_toml())?;

        #[cfg(unix)]
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        tracing::info!(path = %path.display(), "configuration written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use paygate_core::config_loader::load_from_path;
    use tempfile::TempDir;

    #[test]
    fn test_writes_loadable_default_config() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");

        InitCommand::new(false, None).write_config(&path).expect("init");

        let config = load_from_path(&path).expect("load");
        assert_eq!(config, Config::default());
    }

    #[cfg(unix)]
    #[test]
    fn test_config_file_is_private() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");

        InitCommand::new(false, None).write_config(&path).expect("init");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "# mine").expect("write");

        let err = InitCommand::new(false, None).write_config(&path).unwrap_err();
        assert!(matches!(err, InitError::AlreadyInitialized(_)));
        assert_eq!(fs::read_to_string(&path).expect("read"), "# mine");

        InitCommand::new(true, None).write_config(&path).expect("forced init");
        assert_eq!(fs::read_to_string(&path).expect("read"), Config::default_toml());
    }
}
