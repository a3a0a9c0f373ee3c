//! # Fee Command
//!
//! `paygate fee` asks the configured Electrum-style server for a fee estimate
//! and prints it in satoshis per byte.

use paygate_core::config::Config;

use crate::context::RequestContext;
use crate::fee::FeeClient;

use super::{request_context, CommandError};

/// The `paygate fee` command handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeeCommand;

impl FeeCommand {
    /// Create a new `FeeCommand`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Query `client` for the current fee rate.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Fee`] if no usable estimate is obtained.
    pub async fn execute(
        &self,
        client: &FeeClient,
        ctx: &RequestContext,
    ) -> Result<u64, CommandError> {
        Ok(client.current_fee_rate(ctx).await?)
    }

    /// Query the configured endpoint and print the rate.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Fee`] if the client cannot be built or the
    /// service gives no estimate.
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let client = FeeClient::new(config.fee.endpoint())?;
        let rate = self.execute(&client, &request_context(config)).await?;
        println!("{rate} sat/B");
        Ok(())
    }
}
