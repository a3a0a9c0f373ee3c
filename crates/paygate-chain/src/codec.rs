//! Bitcoin transaction codec.
//!
//! Converts between the legacy consensus serialization (and its hex form)
//! and [`bitcoin::Transaction`]. Decoding is strict: the input must contain
//! exactly one complete transaction, with no trailing bytes.
//!
//! # Example
//!
//! ```
//! use paygate_chain::codec;
//!
//! let hex = "01000000017b1eabe0209b1fe794124575ef807057c77ada2138ae4fa8d6c4de0398a14f3f\
//!            0000000000ffffffff01f0ca052a010000001976a914cbc20a7664f2f69e5355aa427045bc15\
//!            e7c6c77288ac00000000";
//!
//! let tx = codec::decode_hex(hex).expect("valid transaction");
//! assert_eq!(tx.input.len(), 1);
//! assert_eq!(codec::encode_hex(&tx), hex);
//! ```

use bitcoin::consensus;
use bitcoin::Transaction;
use paygate_core::error::ParseError;

/// Decode a hex string into a transaction.
///
/// Surrounding whitespace and an optional `0x` prefix are ignored.
///
/// # Errors
///
/// Returns [`ParseError::InvalidHex`] for malformed hex and
/// [`ParseError::MalformedTransaction`] if the bytes do not decode.
pub fn decode_hex(input: &str) -> Result<Transaction, ParseError> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(trimmed).map_err(|e| ParseError::invalid_hex(e.to_string()))?;
    decode(&bytes)
}

/// Decode consensus bytes into a transaction.
///
/// # Errors
///
/// Returns [`ParseError::MalformedTransaction`] if the data is empty,
/// truncated, structurally invalid, or followed by trailing bytes.
pub fn decode(bytes: &[u8]) -> Result<Transaction, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::malformed_transaction("empty transaction data"));
    }

    consensus::deserialize::<Transaction>(bytes)
        .map_err(|e| ParseError::malformed_transaction(e.to_string()))
}

/// Serialize a transaction to consensus bytes.
#[must_use]
pub fn encode(tx: &Transaction) -> Vec<u8> {
    consensus::serialize(tx)
}

/// Serialize a transaction to lowercase hex.
#[must_use]
pub fn encode_hex(tx: &Transaction) -> String {
    hex::encode(encode(tx))
}

/// Transaction id: double SHA-256 of the legacy serialization, byte-reversed, as hex.
#[must_use]
pub fn txid(tx: &Transaction) -> String {
    tx.compute_txid().to_string()
}
