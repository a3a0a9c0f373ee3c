//! Script verification.
//!
//! Consensus evaluation is done by Bitcoin Core's interpreter
//! (libbitcoinconsensus, via [`bitcoin::consensus::verify_script`]) with
//! every consensus flag it supports. That library only accepts consensus
//! flags, so the standard relay-policy rules are checked on the signature
//! script before it runs:
//!
//! - signature scripts must be push-only, using minimal pushes
//! - signatures must be strict DER, low-S, with a defined sighash type
//! - public keys must be compressed or uncompressed SEC encodings
//! - the signature script pushes exactly what the output script consumes
//!   (clean stack)
//!
//! Only pay-to-public-key-hash and pay-to-public-key outputs are verified.

use bitcoin::opcodes::all::{OP_PUSHNUM_1, OP_PUSHNUM_16, OP_PUSHNUM_NEG1};
use bitcoin::script::Instruction;
use bitcoin::secp256k1::ecdsa;
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::{Amount, Script, Transaction};

use crate::codec;

/// Why a script failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// The input index does not exist in the transaction.
    #[error("input index {index} out of range ({inputs} inputs)")]
    InputOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of inputs in the transaction.
        inputs: usize,
    },

    /// The output script is neither P2PKH nor P2PK.
    #[error("unsupported output script template")]
    UnsupportedTemplate,

    /// The signature script could not be split into minimal pushes.
    #[error("malformed script: {0}")]
    Malformed(String),

    /// The signature script contained a non-push opcode.
    #[error("signature script is not push-only")]
    SigPushOnly,

    /// The signature is not strict DER.
    #[error("non-canonical DER signature")]
    SigDer,

    /// The signature S value is above half the curve order.
    #[error("signature S value is not low")]
    SigHighS,

    /// The sighash type byte is not a defined type.
    #[error("undefined sighash type {0:#04x}")]
    SigHashType(u8),

    /// The public key is not a compressed or uncompressed SEC encoding.
    #[error("invalid public key encoding")]
    PubkeyType,

    /// Execution would leave more than one stack element.
    #[error("stack not clean after execution ({0} elements)")]
    CleanStack(usize),

    /// The consensus interpreter rejected the spend.
    #[error("script verification failed: {0}")]
    Consensus(String),
}

/// Verify input `index` of `tx` against the output script it spends.
///
/// # Errors
///
/// Returns the first [`ScriptError`] found: policy checks on the signature
/// script run before consensus evaluation.
pub fn verify_input(
    tx: &Transaction,
    index: usize,
    script_pubkey: &Script,
) -> Result<(), ScriptError> {
    let input = tx.input.get(index).ok_or(ScriptError::InputOutOfRange {
        index,
        inputs: tx.input.len(),
    })?;

    let consumed = if script_pubkey.is_p2pkh() {
        2
    } else if script_pubkey.is_p2pk() {
        1
    } else {
        return Err(ScriptError::UnsupportedTemplate);
    };

    let pushes = push_elements(&input.script_sig)?;
    if pushes.len() > consumed {
        return Err(ScriptError::CleanStack(pushes.len() - consumed + 1));
    }
    if let Some(signature) = pushes.first() {
        check_signature_encoding(signature)?;
    }
    if consumed == 2 {
        if let Some(pubkey) = pushes.get(1) {
            check_pubkey_encoding(pubkey)?;
        }
    }

    // Legacy signature hashes do not commit to the spent amount
    bitcoin::consensus::verify_script(script_pubkey, index, Amount::ZERO, &codec::encode(tx))
        .map_err(|e| ScriptError::Consensus(e.to_string()))
}

/// The elements a push-only script places on the stack.
fn push_elements(script: &Script) -> Result<Vec<Vec<u8>>, ScriptError> {
    script
        .instructions_minimal()
        .map(|instruction| {
            match instruction.map_err(|e| ScriptError::Malformed(e.to_string()))? {
                Instruction::PushBytes(bytes) => Ok(bytes.as_bytes().to_vec()),
                Instruction::Op(op) if op == OP_PUSHNUM_NEG1 => Ok(vec![0x81]),
                Instruction::Op(op)
                    if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&op.to_u8()) =>
                {
                    Ok(vec![op.to_u8() - OP_PUSHNUM_1.to_u8() + 1])
                }
                Instruction::Op(_) => Err(ScriptError::SigPushOnly),
            }
        })
        .collect()
}

/// Encoding rules for `der || hash_type`. An empty signature is allowed: it
/// evaluates to false without an encoding error.
fn check_signature_encoding(signature: &[u8]) -> Result<(), ScriptError> {
    let Some((&hash_type, der)) = signature.split_last() else {
        return Ok(());
    };

    let parsed = ecdsa::Signature::from_der(der).map_err(|_| ScriptError::SigDer)?;
    let mut normalized = parsed;
    normalized.normalize_s();
    if normalized != parsed {
        return Err(ScriptError::SigHighS);
    }

    EcdsaSighashType::from_standard(u32::from(hash_type))
        .map_err(|_| ScriptError::SigHashType(hash_type))?;
    Ok(())
}

fn check_pubkey_encoding(pubkey: &[u8]) -> Result<(), ScriptError> {
    match pubkey {
        [0x02 | 0x03, rest @ ..] if rest.len() == 32 => Ok(()),
        [0x04, rest @ ..] if rest.len() == 64 => Ok(()),
        _ => Err(ScriptError::PubkeyType),
    }
}
