//! # Account Commands
//!
//! ```bash
//! paygate account create alice --limit 100000 --whitelist mkHS9ne12qx9pS9VojpwU5xtRd4T7X7ZUt
//! paygate account show alice
//! paygate account update alice --limit 0
//! ```
//!
//! `create` prints the new account's address; `show` and `update` print the
//! account as JSON. The signing key is never printed.

use paygate_core::config::Config;

use crate::backend::{Backend, Operation, Request, Response, BLACKLIST, TX_SPEND_LIMIT, WHITELIST};
use crate::cli::args::{AccountArgs, AccountCommands};
use crate::context::RequestContext;
use crate::storage::account_path;

use super::{file_backend, request_context, CommandError};

/// The `paygate account` command handler.
#[derive(Debug)]
pub struct AccountCommand {
    command: AccountCommands,
}

impl AccountCommand {
    /// Create a new `AccountCommand`.
    #[must_use]
    pub const fn new(command: AccountCommands) -> Self {
        Self { command }
    }

    /// The backend request for this command.
    #[must_use]
    pub fn request(&self) -> Request {
        match &self.command {
            AccountCommands::Create(args) => policy_request(Operation::Create, args),
            AccountCommands::Show { name } => Request::new(Operation::Read, account_path(name)),
            AccountCommands::Update(args) => policy_request(Operation::Update, args),
        }
    }

    /// Send the request to `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Paygate`] with the backend's error.
    pub async fn execute(
        &self,
        backend: &Backend,
        ctx: &RequestContext,
    ) -> Result<Response, CommandError> {
        Ok(backend.handle(ctx, self.request()).await?)
    }

    /// Run against the configured store and print the result.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the store cannot be opened or the request fails.
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let backend = file_backend(config)?;
        let response = self.execute(&backend, &request_context(config)).await?;

        match &self.command {
            AccountCommands::Create(args) => {
                println!("Created account {}", args.name);
                println!("Address: {}", response.get_str("address").unwrap_or_default());
            }
            AccountCommands::Show { .. } | AccountCommands::Update(_) => {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
        Ok(())
    }
}

fn policy_request(operation: Operation, args: &AccountArgs) -> Request {
    let mut request = Request::new(operation, account_path(&args.name));
    if let Some(limit) = args.limit {
        request = request.with_field(TX_SPEND_LIMIT, limit.to_string());
    }
    if let Some(blacklist) = &args.blacklist {
        request = request.with_field(BLACKLIST, blacklist.as_str());
    }
    if let Some(whitelist) = &args.whitelist {
        request = request.with_field(WHITELIST, whitelist.as_str());
    }
    request
}
