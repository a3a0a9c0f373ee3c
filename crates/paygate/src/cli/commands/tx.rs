//! # Tx Commands
//!
//! `paygate tx decode <TX_HEX>` prints a JSON summary of a raw transaction:
//! txid, version, lock time, inputs, outputs with their addresses on the
//! configured network, and the total output value.

use paygate_chain::{codec, TransactionSummary};
use paygate_core::config::Config;
use paygate_core::network::NetworkParameters;

use super::CommandError;

/// The `paygate tx decode` command handler.
#[derive(Debug, Clone)]
pub struct TxDecodeCommand {
    /// Transaction hex, optional `0x` prefix.
    pub transaction: String,
}

impl TxDecodeCommand {
    /// Create a new `TxDecodeCommand`.
    #[must_use]
    pub fn new(transaction: impl Into<String>) -> Self {
        Self {
            transaction: transaction.into(),
        }
    }

    /// Decode and summarize the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Decode`] for invalid hex or a malformed transaction.
    pub fn summarize(&self, network: NetworkParameters) -> Result<TransactionSummary, CommandError> {
        let tx = codec::decode_hex(&self.transaction)?;
        Ok(TransactionSummary::from_transaction(&tx, network))
    }

    /// Print the summary as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for an unknown network or an undecodable transaction.
    pub fn run(&self, config: &Config) -> Result<(), CommandError> {
        let summary = self.summarize(config.network.parameters()?)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}
