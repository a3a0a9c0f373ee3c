//! # paygate-core
//!
//! Core types, configuration and error definitions for the paygate signing service.
//!
//! ## Modules
//!
//! - [`error`] - Error types, status codes and result aliases
//! - [`types`] - Account policies, payment requests and results
//! - [`network`] - Injected [`NetworkParameters`] and [`RemoteEndpoint`]
//! - [`config`] - TOML configuration
//! - [`config_loader`] - Loading `~/.paygate/config.toml` and preparing the socket directory
//!
//! ## Error Handling
//!
//! ```rust
//! use paygate_core::error::{PaygateError, RpcErrorCode};
//!
//! let err = PaygateError::policy_denied("blacklist", "mkHS9ne12qx9pS9VojpwU5xtRd4T7X7ZUt is blacklisted");
//! assert_eq!(err.status_code(), 400);
//! assert_eq!(RpcErrorCode::from(&err), RpcErrorCode::PolicyDenied);
//! ```
//!
//! [`NetworkParameters`]: network::NetworkParameters
//! [`RemoteEndpoint`]: network::RemoteEndpoint

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod network;
pub mod types;

pub use error::{
    ConfigError, FeeError, ParseError, PaygateError, Result, RpcErrorCode, SignError, StoreError,
};

pub use config::{
    Config, ConfigBuilder, FeeConfig, LoggingConfig, NetworkConfig, ServerConfig, StorageConfig,
};

pub use config_loader::{expand_path, load_settings, prepare_socket_dir, ConfigLoader};

pub use network::{NetworkParameters, RemoteEndpoint};

pub use types::{parse_address_list, AccountPolicy, PaymentRequest, PolicyResult, SignedPayment};
