//! # CLI Command Handlers
//!
//! ## Module Structure
//!
//! - [`init`] - Write the default configuration
//! - [`serve`] - Run the socket server
//! - [`account`] - Create, show and update accounts
//! - [`pay`] - Sign a payment
//! - [`fee`] - Query the fee-rate service
//! - [`tx`] - Summarize a raw transaction
//! - [`exit_codes`] - Process exit codes
//!
//! Account and payment commands go through the same [`Backend`] router the
//! socket server uses, against the configured storage directory.

pub mod account;
pub mod exit_codes;
pub mod fee;
pub mod init;
pub mod pay;
pub mod serve;
pub mod tx;

use std::sync::Arc;

use paygate_core::config::Config;
use paygate_core::error::{ConfigError, FeeError, ParseError, PaygateError, StoreError};

use crate::backend::Backend;
use crate::context::RequestContext;
use crate::logging::new_correlation_id;
use crate::storage::FileAccountStore;

pub use account::AccountCommand;
pub use paygate_core::config_loader::load_settings;
pub use exit_codes::{EXIT_ERROR, EXIT_POLICY_DENIED, EXIT_SUCCESS};
pub use fee::FeeCommand;
pub use init::{InitCommand, InitError};
pub use pay::PayCommand;
pub use serve::{ServeCommand, ServeError};
pub use tx::TxDecodeCommand;

/// Errors from the account, pay, fee and tx commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The backend rejected or failed the request.
    #[error(transparent)]
    Paygate(#[from] PaygateError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The account store could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The fee-rate service failed.
    #[error(transparent)]
    Fee(#[from] FeeError),

    /// The transaction could not be decoded.
    #[error(transparent)]
    Decode(#[from] ParseError),

    /// Output could not be rendered.
    #[error("failed to format output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CommandError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Paygate(e) if e.is_policy_denied() => EXIT_POLICY_DENIED,
            _ => EXIT_ERROR,
        }
    }
}

/// Backend over the configured storage directory and network.
///
/// # Errors
///
/// Returns [`CommandError`] if the network is unknown or the storage
/// directory cannot be created.
pub fn file_backend(config: &Config) -> Result<Backend, CommandError> {
    let network = config.network.parameters()?;
    let store = FileAccountStore::with_path(&config.storage.directory)?;
    Ok(Backend::new(Arc::new(store), network))
}

/// Request context with the configured storage deadline.
#[must_use]
pub fn request_context(config: &Config) -> RequestContext {
    RequestContext::new(config.storage.read_timeout()).with_correlation_id(new_correlation_id())
}
