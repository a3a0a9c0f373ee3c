//! Locating, loading and preparing the paygate configuration.
//!
//! The configuration lives at `~/.paygate/config.toml` unless `--config`
//! names another file. A missing default file means "all defaults"; a
//! missing explicit file is an error. After loading, `~` is expanded in
//! every path and the result is validated.
//!
//! Before serving, [`prepare_socket_dir`] makes sure the socket's directory
//! exists. A directory it creates is private (0700) because the socket
//! itself is the only access control the server has.
//!
//! ```no_run
//! use paygate_core::config_loader::{load_settings, prepare_socket_dir};
//!
//! let config = load_settings(None).expect("failed to load config");
//! let socket = prepare_socket_dir(&config).expect("failed to prepare socket dir");
//! println!("listening on {}", socket.display());
//! ```

use crate::config::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::DirBuilderExt;

const CONFIG_FILE_NAME: &str = "config.toml";

const BASE_DIR_NAME: &str = ".paygate";

/// Mode for directories paygate creates on its own.
const PRIVATE_DIR_MODE: u32 = 0o700;

/// Finds the configuration file under a base directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader rooted at `~/.paygate`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            base_dir: default_base_dir()?,
        })
    }

    /// Loader rooted at `base_dir`.
    ///
    /// ```
    /// use paygate_core::config_loader::ConfigLoader;
    /// use std::path::PathBuf;
    ///
    /// let loader = ConfigLoader::with_base_dir(PathBuf::from("/srv/paygate"));
    /// assert_eq!(loader.config_path(), PathBuf::from("/srv/paygate/config.toml"));
    /// ```
    #[must_use]
    pub const fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Path of `config.toml` under the base directory.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// Load `config.toml`, or the defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseFailed`] for invalid TOML and
    /// [`ConfigError::Io`] if the file cannot be read.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let config_path = self.config_path();
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no configuration file, using defaults");
            return Ok(Config::default());
        }
        load_from_path(&config_path)
    }
}

/// Load `path` (or the default location when `None`), expand `~` and validate.
///
/// # Errors
///
/// Returns [`ConfigError`] if an explicit file is missing, a file cannot be
/// read or parsed, a path cannot be expanded, or a value is invalid.
pub fn load_settings(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_from_path(path)?,
        None => ConfigLoader::new()?.load()?,
    };
    expand_config_paths(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load an explicit configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if the file does not exist,
/// [`ConfigError::Io`] on read failure, and [`ConfigError::ParseFailed`] on invalid TOML.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::file_not_found(path.display().to_string()));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::io(format!("failed to read {}", path.display()), e))?;

    toml::from_str(&content)
        .map_err(|e| ConfigError::parse_failed(format!("invalid TOML in {}: {e}", path.display())))
}

/// Expand a leading `~` to the home directory.
///
/// ```
/// use paygate_core::config_loader::expand_path;
///
/// let path = expand_path("/etc/paygate/config.toml").expect("failed to expand path");
/// assert_eq!(path.to_string_lossy(), "/etc/paygate/config.toml");
/// ```
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the path starts with `~` and
/// the home directory cannot be determined.
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
        Ok(home.join(rest))
    } else if path == "~" {
        dirs::home_dir().ok_or_else(ConfigError::no_home_directory)
    } else {
        Ok(PathBuf::from(path))
    }
}

/// `~/.paygate`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the home directory cannot be determined.
pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
    Ok(home.join(BASE_DIR_NAME))
}

/// Expand `~` in the socket path, the storage directory and the log file.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if a path needs the home directory
/// and it cannot be determined.
pub fn expand_config_paths(config: &mut Config) -> Result<(), ConfigError> {
    config.server.socket_path = expand_path(&config.server.socket_path)?
        .to_string_lossy()
        .to_string();

    config.storage.directory = expand_path(&config.storage.directory)?
        .to_string_lossy()
        .to_string();

    if let Some(file) = config.logging.file.as_deref() {
        config.logging.file = Some(expand_path(file)?.to_string_lossy().to_string());
    }

    Ok(())
}

/// Expand the socket path and create its directory if it is missing.
///
/// Missing directories are created with mode 0700. An existing directory is
/// left untouched, so a shared parent such as `/tmp` keeps its mode.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the path cannot be expanded,
/// or [`ConfigError::Io`] if the directory cannot be created.
pub fn prepare_socket_dir(config: &Config) -> Result<PathBuf, ConfigError> {
    let socket_path = expand_path(&config.server.socket_path)?;

    if let Some(dir) = socket_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !dir.exists() {
            create_private_dir(dir)?;
            tracing::info!(dir = %dir.display(), "created socket directory");
        }
    }

    Ok(socket_path)
}

fn create_private_dir(dir: &Path) -> Result<(), ConfigError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(PRIVATE_DIR_MODE);

    builder.create(dir).map_err(|e| {
        ConfigError::io(format!("failed to create directory {}", dir.display()), e)
    })
}
