//! Configuration types for the paygate signing service.
//!
//! Configuration is stored in TOML format at `~/.paygate/config.toml`. Every
//! field has a default, so an empty or missing file yields a working
//! configuration pointed at Bitcoin testnet.
//!
//! # Examples
//!
//! ```
//! use paygate_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.server.socket_path, "~/.paygate/paygate.sock");
//! assert_eq!(config.network.network, "testnet");
//! assert_eq!(config.fee.max_attempts, 5);
//! ```
//!
//! # Default TOML Output
//!
//! ```toml
//! [server]
//! socket_path = "~/.paygate/paygate.sock"
//! timeout_secs = 30
//! socket_permissions = 0o600
//!
//! [network]
//! network = "testnet"
//!
//! [storage]
//! directory = "~/.paygate/accounts"
//! read_timeout_ms = 5000
//!
//! [fee]
//! host = "testnet.hsmiths.com"
//! port = 53012
//! tls = true
//! timeout_secs = 10
//! max_attempts = 5
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use crate::error::ConfigError;
use crate::network::{NetworkParameters, RemoteEndpoint};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the paygate signing service.
///
/// ```
/// use paygate_core::config::Config;
///
/// let toml_str = r#"
/// [network]
/// network = "regtest"
///
/// [fee]
/// host = "127.0.0.1"
/// port = 50001
/// tls = false
/// "#;
///
/// let config: Config = toml::from_str(toml_str).expect("valid TOML");
/// assert_eq!(config.fee.port, 50001);
/// assert_eq!(config.storage.read_timeout_ms, 5000);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Unix socket server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Bitcoin network selection.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Account storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Fee-rate service settings.
    #[serde(default)]
    pub fee: FeeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============================================================================
// [server]
// ============================================================================

/// Returns the default Unix socket path, `~/.paygate/paygate.sock`.
#[must_use]
fn default_socket_path() -> String {
    "~/.paygate/paygate.sock".to_string()
}

/// Returns the default request timeout in seconds.
#[must_use]
const fn default_timeout() -> u64 {
    30
}

/// Returns the default socket file mode (owner read/write).
#[must_use]
const fn default_socket_permissions() -> u32 {
    0o600
}

/// Server configuration for the paygate daemon.
///
/// # Security Considerations
///
/// The socket grants full use of every managed account's key. Keep the
/// permissions at `0o600` unless the socket directory is otherwise protected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Unix socket path. Supports `~` expansion.
    ///
    /// Default: `~/.paygate/paygate.sock`
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Per-request timeout in seconds.
    ///
    /// Default: 30 seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// File mode applied to the socket after binding.
    ///
    /// Default: `0o600`
    #[serde(default = "default_socket_permissions")]
    pub socket_permissions: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            timeout_secs: default_timeout(),
            socket_permissions: default_socket_permissions(),
        }
    }
}

impl ServerConfig {
    /// The request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// [network]
// ============================================================================

fn default_network() -> String {
    "testnet".to_string()
}

/// Bitcoin network selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// One of `bitcoin`, `testnet`, `signet`, `regtest`.
    ///
    /// Default: `testnet`
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
        }
    }
}

impl NetworkConfig {
    /// Parse the configured network.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the name is not a known network.
    pub fn parameters(&self) -> Result<NetworkParameters, ConfigError> {
        self.network.parse()
    }
}

// ============================================================================
// [storage]
// ============================================================================

/// Returns the default account storage directory, `~/.paygate/accounts`.
#[must_use]
fn default_storage_dir() -> String {
    "~/.paygate/accounts".to_string()
}

/// Returns the default storage read deadline in milliseconds.
#[must_use]
const fn default_read_timeout_ms() -> u64 {
    5000
}

/// Account storage configuration.
///
/// # Directory Structure
///
/// ```text
/// ~/.paygate/accounts/
/// ├── alice.json
/// └── bob.json
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding one JSON record per account. Supports `~` expansion.
    ///
    /// Default: `~/.paygate/accounts`
    #[serde(default = "default_storage_dir")]
    pub directory: String,

    /// Deadline for a single storage read, in milliseconds.
    ///
    /// Default: 5000
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_storage_dir(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl StorageConfig {
    /// The read deadline as a [`Duration`].
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

// ============================================================================
// [fee]
// ============================================================================

fn default_fee_host() -> String {
    "testnet.hsmiths.com".to_string()
}

const fn default_fee_port() -> u16 {
    53012
}

const fn default_fee_tls() -> bool {
    true
}

const fn default_fee_timeout() -> u64 {
    10
}

const fn default_fee_attempts() -> u32 {
    5
}

/// Fee-rate service configuration (an Electrum-protocol server).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeConfig {
    /// Server host name.
    ///
    /// Default: `testnet.hsmiths.com`
    #[serde(default = "default_fee_host")]
    pub host: String,

    /// Server port.
    ///
    /// Default: 53012
    #[serde(default = "default_fee_port")]
    pub port: u16,

    /// Connect over TLS.
    ///
    /// Default: `true`
    #[serde(default = "default_fee_tls")]
    pub tls: bool,

    /// Deadline for one attempt, in seconds.
    ///
    /// Default: 10
    #[serde(default = "default_fee_timeout")]
    pub timeout_secs: u64,

    /// Maximum attempts while the server returns no usable estimate.
    ///
    /// Default: 5
    #[serde(default = "default_fee_attempts")]
    pub max_attempts: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            host: default_fee_host(),
            port: default_fee_port(),
            tls: default_fee_tls(),
            timeout_secs: default_fee_timeout(),
            max_attempts: default_fee_attempts(),
        }
    }
}

impl FeeConfig {
    /// Build the [`RemoteEndpoint`] described by this section.
    #[must_use]
    pub fn endpoint(&self) -> RemoteEndpoint {
        RemoteEndpoint::new(self.host.clone(), self.port)
            .with_tls(self.tls)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_attempts(self.max_attempts)
    }
}

// ============================================================================
// [logging]
// ============================================================================

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    ///
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// One of `pretty`, `json`, `compact`.
    ///
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional log file; logs go to stderr when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

// ============================================================================
// Config
// ============================================================================

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field:
    /// an empty path or host, a zero timeout, port or attempt budget, or an
    /// unknown network, log level or log format.
    ///
    /// ```
    /// use paygate_core::config::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.fee.max_attempts = 0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.socket_path.is_empty() {
            return Err(ConfigError::invalid_value("server.socket_path", "<empty>"));
        }

        if self.server.timeout_secs == 0 {
            return Err(ConfigError::invalid_value("server.timeout_secs", "0"));
        }

        self.network.parameters()?;

        if self.storage.directory.is_empty() {
            return Err(ConfigError::invalid_value("storage.directory", "<empty>"));
        }

        if self.storage.read_timeout_ms == 0 {
            return Err(ConfigError::invalid_value("storage.read_timeout_ms", "0"));
        }

        if self.fee.host.is_empty() {
            return Err(ConfigError::invalid_value("fee.host", "<empty>"));
        }

        if self.fee.port == 0 {
            return Err(ConfigError::invalid_value("fee.port", "0"));
        }

        if self.fee.timeout_secs == 0 {
            return Err(ConfigError::invalid_value("fee.timeout_secs", "0"));
        }

        if self.fee.max_attempts == 0 {
            return Err(ConfigError::invalid_value("fee.max_attempts", "0"));
        }

        if !matches!(
            self.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                self.logging.level.clone(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json" | "compact") {
            return Err(ConfigError::invalid_value(
                "logging.format",
                self.logging.format.clone(),
            ));
        }

        Ok(())
    }

    /// Generates the default configuration as a commented TOML string.
    ///
    /// ```
    /// use paygate_core::config::Config;
    ///
    /// let parsed: Config = toml::from_str(&Config::default_toml()).unwrap();
    /// assert_eq!(parsed, Config::default());
    /// ```
    #[must_use]
    pub fn default_toml() -> String {
        r#"# paygate configuration

[server]
socket_path = "~/.paygate/paygate.sock"
timeout_secs = 30
socket_permissions = 0o600

[network]
# bitcoin | testnet | signet | regtest
network = "testnet"

[storage]
directory = "~/.paygate/accounts"
read_timeout_ms = 5000

[fee]
# Electrum server queried with blockchain.estimatefee
host = "testnet.hsmiths.com"
port = 53012
tls = true
timeout_secs = 10
max_attempts = 5

[logging]
# trace | debug | info | warn | error
level = "info"
# pretty | json | compact
format = "pretty"
# file = "~/.paygate/logs/paygate.log"
"#
        .to_string()
    }

    /// Creates a configuration builder for customizing values.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for creating customized [`Config`] instances.
///
/// ```
/// use paygate_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .socket_path("/tmp/paygate.sock")
///     .network("regtest")
///     .storage_directory("/tmp/accounts")
///     .fee_endpoint("127.0.0.1", 50001, false)
///     .build();
///
/// assert_eq!(config.fee.host, "127.0.0.1");
/// assert!(!config.fee.tls);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets the Unix socket path.
    #[must_use]
    pub fn socket_path(mut self, path: impl Into<String>) -> Self {
        self.config.server.socket_path = path.into();
        self
    }

    /// Sets the request timeout in seconds.
    #[must_use]
    pub const fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.server.timeout_secs = secs;
        self
    }

    /// Sets the network name.
    #[must_use]
    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.config.network.network = network.into();
        self
    }

    /// Sets the account storage directory.
    #[must_use]
    pub fn storage_directory(mut self, dir: impl Into<String>) -> Self {
        self.config.storage.directory = dir.into();
        self
    }

    /// Sets the storage read deadline.
    #[must_use]
    pub const fn read_timeout_ms(mut self, millis: u64) -> Self {
        self.config.storage.read_timeout_ms = millis;
        self
    }

    /// Sets the fee service host, port and transport.
    #[must_use]
    pub fn fee_endpoint(mut self, host: impl Into<String>, port: u16, tls: bool) -> Self {
        self.config.fee.host = host.into();
        self.config.fee.port = port;
        self.config.fee.tls = tls;
        self
    }

    /// Sets the log level.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}
