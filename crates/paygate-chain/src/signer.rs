//! Legacy P2PKH transaction signing.
//!
//! [`SigningEngine::sign`] fills the signature script of every input with a
//! `SIGHASH_ALL` signature and the compressed public key, then immediately
//! verifies that input with libbitcoinconsensus. Each input moves through
//! [`InputState`]:
//!
//! ```text
//! Unsigned ──sign──▶ Signed ──verify ok──▶ Verified
//!                          └─verify err──▶ Failed
//! ```
//!
//! A single failure aborts the whole operation: no partially signed
//! transaction is ever returned.

use crate::codec;
use crate::script::{self, ScriptError};
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Address, Script, ScriptBuf, Transaction};
use paygate_core::error::SignError;
use paygate_core::network::NetworkParameters;
use paygate_crypto::{Secp256k1KeyPair, SecretKey};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a single input during signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputState {
    /// No signature script yet.
    Unsigned,
    /// Signature script written, not yet verified.
    Signed,
    /// Signature script verified by script execution.
    Verified,
    /// Signature script failed verification.
    Failed,
}

impl InputState {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unsigned => "unsigned",
            Self::Signed => "signed",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final state of every input after a signing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningReport {
    states: Vec<InputState>,
}

impl SigningReport {
    fn new(inputs: usize) -> Self {
        Self {
            states: vec![InputState::Unsigned; inputs],
        }
    }

    fn advance(&mut self, index: usize, state: InputState) {
        if let Some(slot) = self.states.get_mut(index) {
            *slot = state;
        }
    }

    /// Per-input states, in input order.
    #[must_use]
    pub fn states(&self) -> &[InputState] {
        &self.states
    }

    /// Returns `true` if every input reached [`InputState::Verified`].
    #[must_use]
    pub fn all_verified(&self) -> bool {
        self.states.iter().all(|s| *s == InputState::Verified)
    }
}

/// A fully signed and verified transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    transaction: Transaction,
    report: SigningReport,
}

impl SignedTransaction {
    /// The signed transaction.
    #[must_use]
    pub const fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Consume and return the signed transaction.
    #[must_use]
    pub fn into_transaction(self) -> Transaction {
        self.transaction
    }

    /// Per-input outcome of the signing run.
    #[must_use]
    pub const fn report(&self) -> &SigningReport {
        &self.report
    }

    /// Transaction id of the signed transaction.
    #[must_use]
    pub fn txid(&self) -> String {
        codec::txid(&self.transaction)
    }

    /// Hex serialization of the signed transaction.
    #[must_use]
    pub fn to_hex(&self) -> String {
        codec::encode_hex(&self.transaction)
    }
}

/// Signs unsigned legacy transactions on one network.
///
/// ```
/// use paygate_chain::{codec, SigningEngine};
/// use paygate_core::network::NetworkParameters;
/// use paygate_crypto::{Secp256k1KeyPair, SecretKey};
///
/// let network = NetworkParameters::testnet();
/// let keypair = Secp256k1KeyPair::generate();
/// let source = keypair.p2pkh_address(network).to_string();
/// let key = keypair.secret_key();
///
/// let tx = codec::decode_hex(
///     "01000000017b1eabe0209b1fe794124575ef807057c77ada2138ae4fa8d6c4de0398a14f3f\
///      0000000000ffffffff01f0ca052a010000001976a914cbc20a7664f2f69e5355aa427045bc15\
///      e7c6c77288ac00000000",
/// ).unwrap();
///
/// let signed = SigningEngine::new(network).sign(key, &source, tx, 35).unwrap();
/// assert!(signed.report().all_verified());
/// assert_eq!(signed.txid().len(), 64);
/// ```
pub struct SigningEngine {
    network: NetworkParameters,
}

impl SigningEngine {
    /// Create an engine for `network`.
    #[must_use]
    pub fn new(network: NetworkParameters) -> Self {
        Self { network }
    }

    /// The network source addresses must belong to.
    #[must_use]
    pub const fn network(&self) -> NetworkParameters {
        self.network
    }

    /// Sign every input of `tx` with `key` and verify each one.
    ///
    /// `key` is moved in and erased when this call returns. `amount` is the
    /// value being spent; legacy signature hashes do not commit to it, so
    /// it is only recorded in the logs.
    ///
    /// # Errors
    ///
    /// - [`SignError::InvalidKey`] if `key` is not a valid scalar
    /// - [`SignError::InvalidAddress`] if `source_address` does not parse, is
    ///   for another network, or is not P2PKH
    /// - [`SignError::ScriptGeneration`] if an input carries witness data or its
    ///   signature hash cannot be computed
    /// - [`SignError::VerificationFailed`] if a signed input does not verify
    pub fn sign(
        &self,
        key: SecretKey,
        source_address: &str,
        mut tx: Transaction,
        amount: u64,
    ) -> Result<SignedTransaction, SignError> {
        let keypair = Secp256k1KeyPair::from_secret_key(key)?;
        let script_pubkey = self.source_script(source_address)?;

        let mut report = SigningReport::new(tx.input.len());

        for index in 0..tx.input.len() {
            let script_sig = Self::signature_script(&keypair, &tx, index, &script_pubkey)?;
            if let Some(input) = tx.input.get_mut(index) {
                input.script_sig = script_sig;
            }
            report.advance(index, InputState::Signed);

            if let Err(e) = script::verify_input(&tx, index, &script_pubkey) {
                report.advance(index, InputState::Failed);
                tracing::warn!(input = index, error = %e, "signed input failed verification");
                return Err(SignError::verification_failed(index, e.to_string()));
            }
            report.advance(index, InputState::Verified);
        }

        tracing::debug!(
            inputs = tx.input.len(),
            amount,
            source = source_address,
            "transaction signed"
        );

        Ok(SignedTransaction {
            transaction: tx,
            report,
        })
    }

    /// Verify one input of an already signed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::VerificationFailed`] naming `index` if execution fails.
    pub fn verify_input(
        &self,
        tx: &Transaction,
        index: usize,
        script_pubkey: &Script,
    ) -> Result<(), SignError> {
        script::verify_input(tx, index, script_pubkey)
            .map_err(|e: ScriptError| SignError::verification_failed(index, e.to_string()))
    }

    fn source_script(&self, source_address: &str) -> Result<ScriptBuf, SignError> {
        let address = Address::from_str(source_address)
            .map_err(|e| SignError::invalid_address(source_address, e.to_string()))?
            .require_network(self.network.network())
            .map_err(|e| SignError::invalid_address(source_address, e.to_string()))?;

        let script_pubkey = address.script_pubkey();
        if !script_pubkey.is_p2pkh() {
            return Err(SignError::invalid_address(
                source_address,
                "only pay-to-public-key-hash addresses can be signed",
            ));
        }

        Ok(script_pubkey)
    }

    fn signature_script(
        keypair: &Secp256k1KeyPair,
        tx: &Transaction,
        index: usize,
        script_pubkey: &Script,
    ) -> Result<ScriptBuf, SignError> {
        if tx.input.get(index).is_some_and(|input| !input.witness.is_empty()) {
            return Err(SignError::script_generation(
                index,
                "segregated witness inputs are not supported",
            ));
        }

        let sighash = SighashCache::new(tx)
            .legacy_signature_hash(index, script_pubkey, EcdsaSighashType::All.to_u32())
            .map_err(|e| SignError::script_generation(index, e.to_string()))?;

        let signature = keypair.sign_digest(sighash.to_byte_array());
        let mut bytes = signature.serialize_der().to_vec();
        bytes.push(EcdsaSighashType::All as u8);

        let push = PushBytesBuf::try_from(bytes)
            .map_err(|e| SignError::script_generation(index, e.to_string()))?;

        Ok(Builder::new()
            .push_slice(push)
            .push_key(keypair.public_key())
            .into_script())
    }
}

impl fmt::Debug for SigningEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningEngine")
            .field("network", &self.network)
            .finish()
    }
}
