//! Injected network and remote-service parameters.
//!
//! Neither the signing engine nor the fee client reads a global setting:
//! the Bitcoin network is passed around as [`NetworkParameters`] and the fee
//! service location as [`RemoteEndpoint`].

use crate::error::ConfigError;
use bitcoin::Network;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The Bitcoin network addresses and keys are interpreted on.
///
/// ```
/// use paygate_core::network::NetworkParameters;
///
/// let params: NetworkParameters = "testnet".parse().unwrap();
/// assert_eq!(params, NetworkParameters::testnet());
/// assert_eq!(params.to_string(), "testnet");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkParameters {
    network: Network,
}

impl NetworkParameters {
    /// Wrap a `bitcoin::Network`.
    #[must_use]
    pub const fn new(network: Network) -> Self {
        Self { network }
    }

    /// Bitcoin mainnet.
    #[must_use]
    pub const fn mainnet() -> Self {
        Self::new(Network::Bitcoin)
    }

    /// Bitcoin testnet3.
    #[must_use]
    pub const fn testnet() -> Self {
        Self::new(Network::Testnet)
    }

    /// Local regression-test network.
    #[must_use]
    pub const fn regtest() -> Self {
        Self::new(Network::Regtest)
    }

    /// The wrapped network.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }

    /// Canonical name used in configuration files.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self.network {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
            _ => "unknown",
        }
    }
}

impl Default for NetworkParameters {
    fn default() -> Self {
        Self::testnet()
    }
}

impl fmt::Display for NetworkParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NetworkParameters {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let network = match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" | "main" => Network::Bitcoin,
            "testnet" | "testnet3" | "test" => Network::Testnet,
            "signet" => Network::Signet,
            "regtest" => Network::Regtest,
            _ => return Err(ConfigError::invalid_value("network.network", s)),
        };
        Ok(Self::new(network))
    }
}

impl From<Network> for NetworkParameters {
    fn from(network: Network) -> Self {
        Self::new(network)
    }
}

/// Location and retry budget of the remote fee-rate service.
///
/// ```
/// use paygate_core::network::RemoteEndpoint;
///
/// let endpoint = RemoteEndpoint::new("127.0.0.1", 50001).with_tls(false);
/// assert_eq!(endpoint.address(), "127.0.0.1:50001");
/// assert_eq!(endpoint.max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    /// Host name; also the TLS server name.
    pub host: String,

    /// TCP port.
    pub port: u16,

    /// Whether to wrap the connection in TLS.
    pub tls: bool,

    /// Deadline for a single attempt (connect, handshake, request and reply).
    pub timeout: Duration,

    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
}

impl RemoteEndpoint {
    /// Default per-attempt deadline.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default attempt budget.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Create an endpoint with TLS enabled and default timeout and attempts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: true,
            timeout: Self::DEFAULT_TIMEOUT,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Enable or disable TLS.
    #[must_use]
    pub const fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Set the per-attempt deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempt budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// `host:port`, suitable for `TcpStream::connect`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.tls { "tls" } else { "tcp" };
        write!(f, "{scheme}://{}:{}", self.host, self.port)
    }
}
