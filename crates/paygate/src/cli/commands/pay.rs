//! # Pay Command
//!
//! `paygate pay` signs an unsigned transaction from the source account to the
//! destination account after the source account's policy allows it.
//!
//! ## Output Formats
//!
//! ### Hex (default)
//!
//! ```text
//! 0100000001...
//! ```
//!
//! ### JSON
//!
//! ```json
//! {
//!   "signed_transaction": "0100000001...",
//!   "source_address": "mkHS9ne12qx9pS9VojpwU5xtRd4T7X7ZUt",
//!   "transaction_hash": "4f1c..."
//! }
//! ```
//!
//! ## Exit Codes
//!
//! - 0: Success
//! - 1: Policy denied
//! - 2: Other error

use paygate_core::config::Config;

use crate::backend::{Backend, Operation, Request, Response, PAYMENTS_PATH};
use crate::cli::args::{OutputFormat, PayArgs};
use crate::context::RequestContext;
use crate::payments::fields;

use super::{file_backend, request_context, CommandError};

/// The `paygate pay` command handler.
#[derive(Debug, Clone)]
pub struct PayCommand {
    args: PayArgs,
}

impl PayCommand {
    /// Create a new `PayCommand`.
    #[must_use]
    pub const fn new(args: PayArgs) -> Self {
        Self { args }
    }

    /// The backend request for this payment.
    #[must_use]
    pub fn request(&self) -> Request {
        let mut request = Request::new(Operation::Create, PAYMENTS_PATH)
            .with_field(fields::SOURCE, self.args.source.as_str())
            .with_field(fields::DESTINATION, self.args.destination.as_str())
            .with_field(fields::AMOUNT, self.args.amount.to_string())
            .with_field(fields::UNSIGNED_TX, self.args.tx.as_str());

        if let Some(signers) = &self.args.additional_signers {
            request = request.with_field(fields::ADDITIONAL_SIGNERS, signers.as_str());
        }
        request
    }

    /// Send the payment to `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Paygate`] with the backend's error; a policy
    /// denial maps to exit code 1.
    pub async fn execute(
        &self,
        backend: &Backend,
        ctx: &RequestContext,
    ) -> Result<Response, CommandError> {
        Ok(backend.handle(ctx, self.request()).await?)
    }

    /// Render a signed payment in the requested format.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Output`] if JSON rendering fails.
    pub fn render(&self, response: &Response) -> Result<String, CommandError> {
        match self.args.format {
            OutputFormat::Hex => Ok(response
                .get_str("signed_transaction")
                .unwrap_or_default()
                .to_string()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
        }
    }

    /// Run against the configured store and print the signed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the store cannot be opened or the payment fails.
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let backend = file_backend(config)?;
        let response = self.execute(&backend, &request_context(config)).await?;
        println!("{}", self.render(&response)?);
        Ok(())
    }
}
