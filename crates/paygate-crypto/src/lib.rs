//! # paygate-crypto
//!
//! Key material handling for the paygate signing service.
//!
//! - [`keys`] - [`SecretKey`], a zeroize-on-drop, non-`Clone` 32-byte scalar with WIF import/export
//! - [`keypair`] - [`Secp256k1KeyPair`], signing and P2PKH address derivation
//!
//! ## Security
//!
//! - Key material is zeroized when dropped
//! - `Debug` output never contains key bytes
//! - Key types are moved into signing, never cloned
//!
//! ```rust
//! use paygate_core::network::NetworkParameters;
//! use paygate_crypto::{Secp256k1KeyPair, SecretKey};
//!
//! let secret = SecretKey::generate();
//! let wif = secret.to_wif(NetworkParameters::testnet()).expect("valid key");
//!
//! let keypair = Secp256k1KeyPair::from_wif(&wif).expect("valid WIF");
//! println!("{}", keypair.p2pkh_address(NetworkParameters::testnet()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod keypair;
pub mod keys;

pub use keypair::Secp256k1KeyPair;
pub use keys::{SecretKey, SecretKeyError, SECRET_KEY_LEN};
