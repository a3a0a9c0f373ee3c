//! Human-readable transaction summaries.
//!
//! Used by the `tx decode` command and the `decodeTransaction` socket method to
//! show what an unsigned transaction spends before it is submitted for
//! signing.

use crate::codec;
use bitcoin::{Address, Transaction};
use paygate_core::network::NetworkParameters;
use serde::Serialize;

/// Summary of one transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSummary {
    /// `txid:vout` of the spent output.
    pub previous_output: String,
    /// Raw sequence number.
    pub sequence: u32,
    /// Length of the signature script in bytes.
    pub script_sig_len: usize,
    /// Whether the input already carries a signature script.
    pub signed: bool,
}

/// Summary of one transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    /// Value in satoshis.
    pub value: u64,
    /// Destination address, when the script is a standard template.
    pub address: Option<String>,
    /// `true` for provably unspendable data carrier outputs.
    pub op_return: bool,
}

/// Summary of a whole transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    /// Transaction id.
    pub txid: String,
    /// Version field.
    pub version: i32,
    /// Raw lock time.
    pub lock_time: u32,
    /// Inputs in order.
    pub inputs: Vec<InputSummary>,
    /// Outputs in order.
    pub outputs: Vec<OutputSummary>,
    /// Sum of all output values in satoshis.
    pub total_output: u64,
    /// Serialized size in bytes.
    pub size: usize,
}

impl TransactionSummary {
    /// Summarize `tx`, rendering output addresses for `network`.
    #[must_use]
    pub fn from_transaction(tx: &Transaction, network: NetworkParameters) -> Self {
        let inputs = tx
            .input
            .iter()
            .map(|input| InputSummary {
                previous_output: input.previous_output.to_string(),
                sequence: input.sequence.0,
                script_sig_len: input.script_sig.len(),
                signed: !input.script_sig.is_empty(),
            })
            .collect();

        let outputs: Vec<OutputSummary> = tx
            .output
            .iter()
            .map(|output| OutputSummary {
                value: output.value.to_sat(),
                address: Address::from_script(&output.script_pubkey, network.network())
                    .ok()
                    .map(|a| a.to_string()),
                op_return: output.script_pubkey.is_op_return(),
            })
            .collect();

        let total_output = outputs
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.value));

        Self {
            txid: codec::txid(tx),
            version: tx.version.0,
            lock_time: tx.lock_time.to_consensus_u32(),
            inputs,
            outputs,
            total_output,
            size: codec::encode(tx).len(),
        }
    }

    /// Returns `true` if every input carries a signature script.
    #[must_use]
    pub fn is_fully_signed(&self) -> bool {
        !self.inputs.is_empty() && self.inputs.iter().all(|i| i.signed)
    }
}
