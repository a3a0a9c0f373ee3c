//! # paygate-chain
//!
//! Bitcoin transaction handling for the paygate signing service.
//!
//! ## Modules
//!
//! - [`codec`] - Strict consensus encoding and decoding of transactions
//! - [`script`] - Policy checks plus libbitcoinconsensus verification of signed inputs
//! - [`signer`] - Legacy P2PKH signing with per-input verification
//! - [`summary`] - Serializable transaction summaries
//!
//! ## Signing a payment
//!
//! ```
//! use paygate_chain::{codec, SigningEngine};
//! use paygate_core::network::NetworkParameters;
//! use paygate_crypto::Secp256k1KeyPair;
//!
//! let network = NetworkParameters::testnet();
//! let keypair = Secp256k1KeyPair::generate();
//! let source = keypair.p2pkh_address(network).to_string();
//!
//! let unsigned = codec::decode_hex(
//!     "01000000017b1eabe0209b1fe794124575ef807057c77ada2138ae4fa8d6c4de0398a14f3f\
//!      0000000000ffffffff01f0ca052a010000001976a914cbc20a7664f2f69e5355aa427045bc15\
//!      e7c6c77288ac00000000",
//! )?;
//!
//! let signed = SigningEngine::new(network).sign(keypair.secret_key(), &source, unsigned, 35)?;
//! println!("{} -> {}", signed.txid(), signed.to_hex());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod script;
pub mod signer;
pub mod summary;

pub use script::ScriptError;
pub use signer::{InputState, SignedTransaction, SigningEngine, SigningReport};
pub use summary::{InputSummary, OutputSummary, TransactionSummary};
