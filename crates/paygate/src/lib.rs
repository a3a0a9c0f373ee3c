//! # paygate
//!
//! Policy-gated Bitcoin payment signing service.
//!
//! Paygate keeps one signing key per named account. A payment names a source
//! and a destination account, an amount and an unsigned legacy transaction;
//! the source account's policy (spend limit, blacklist, whitelist) is checked
//! against the destination's address before every input is signed and
//! verified with the source key.
//!
//! ## Modules
//!
//! - [`backend`] - Request router for `accounts/<name>` and `payments`
//! - [`payments`] - Payment orchestration: validate, load, check, decode, sign
//! - [`storage`] - Account records and the [`AccountStore`] collaborator
//! - [`context`] - Per-request read deadline and cancellation
//! - [`fee`] - Fee-rate client for an Electrum-style JSON-RPC server
//! - [`server`] - JSON-RPC 2.0 over a Unix socket
//! - [`cli`] - Command-line interface definitions and handlers
//! - [`logging`] - `tracing` subscriber setup
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use paygate::backend::{Backend, Operation, Request};
//! use paygate::context::RequestContext;
//! use paygate::storage::MemoryAccountStore;
//! use paygate_core::network::NetworkParameters;
//!
//! # async fn example() -> Result<(), paygate_core::error::PaygateError> {
//! let backend = Backend::new(Arc::new(MemoryAccountStore::new()), NetworkParameters::testnet());
//! let ctx = RequestContext::default();
//!
//! let created = backend
//!     .handle(&ctx, Request::new(Operation::Create, "accounts/alice").with_field("tx_spend_limit", "100000"))
//!     .await?;
//! println!("alice: {}", created.get_str("address").unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! [`AccountStore`]: storage::AccountStore

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod cli;
pub mod context;
pub mod fee;
pub mod logging;
pub mod payments;
pub mod server;
pub mod storage;

pub use backend::{Backend, Operation, Request, Response};
pub use context::RequestContext;
pub use fee::FeeClient;
pub use logging::{
    init_logging, new_correlation_id, redact_sensitive, verbosity_to_level, LogConfig, LogError,
    LogFormat, LogGuard, LogLevel,
};
pub use payments::PaymentOrchestrator;
pub use storage::{AccountRecord, AccountStore, FileAccountStore, MemoryAccountStore};
