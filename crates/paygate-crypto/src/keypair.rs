//! secp256k1 key pair used for legacy Bitcoin signing.
//!
//! # Example
//!
//! ```rust
//! use paygate_core::network::NetworkParameters;
//! use paygate_crypto::keypair::Secp256k1KeyPair;
//!
//! let keypair = Secp256k1KeyPair::generate();
//! let address = keypair.p2pkh_address(NetworkParameters::testnet());
//! assert!(address.to_string().starts_with('m') || address.to_string().starts_with('n'));
//! assert_eq!(keypair.public_key().to_bytes().len(), 33);
//! ```

use crate::keys::SecretKey;
use bitcoin::secp256k1::{self, ecdsa, All, Message, Secp256k1};
use bitcoin::{Address, PublicKey};
use paygate_core::error::SignError;
use paygate_core::network::NetworkParameters;

/// A secp256k1 signing key together with its compressed public key.
///
/// The scalar is erased when the key pair is dropped. Like [`SecretKey`],
/// this type is not `Clone`.
#[allow(clippy::struct_field_names)]
pub struct Secp256k1KeyPair {
    secp: Secp256k1<All>,
    secret_key: secp256k1::SecretKey,
    public_key: PublicKey,
}

impl Secp256k1KeyPair {
    /// Create a key pair from a [`SecretKey`], consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if the bytes are not a valid
    /// secp256k1 scalar.
    pub fn from_secret_key(secret: SecretKey) -> Result<Self, SignError> {
        let secret_key = secret
            .into_secp256k1()
            .map_err(|e| SignError::invalid_key(e.to_string()))?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::new(secp256k1::PublicKey::from_secret_key(&secp, &secret_key));

        Ok(Self {
            secp,
            secret_key,
            public_key,
        })
    }

    /// Decode a WIF string directly into a key pair.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if the WIF or the scalar is invalid.
    /// The error never contains the WIF text.
    pub fn from_wif(wif: &str) -> Result<Self, SignError> {
        let secret = SecretKey::from_wif(wif).map_err(|e| SignError::invalid_key(e.to_string()))?;
        Self::from_secret_key(secret)
    }

    /// Generate a fresh random key pair.
    #[must_use]
    pub fn generate() -> Self {
        // SecretKey::generate only yields valid scalars.
        Self::from_secret_key(SecretKey::generate())
            .unwrap_or_else(|_| unreachable!("generated an invalid secp256k1 scalar"))
    }

    /// The compressed public key.
    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// The pay-to-public-key-hash address of the compressed public key.
    #[must_use]
    pub fn p2pkh_address(&self, network: NetworkParameters) -> Address {
        Address::p2pkh(self.public_key.pubkey_hash(), network.network())
    }

    /// Export the secret as a [`SecretKey`], leaving this key pair intact.
    ///
    /// Used when a freshly generated key has to be persisted.
    #[must_use]
    pub fn secret_key(&self) -> SecretKey {
        SecretKey::new(self.secret_key.secret_bytes())
    }

    /// Sign a 32-byte digest. The signature is low-S normalized.
    #[must_use]
    pub fn sign_digest(&self, digest: [u8; 32]) -> ecdsa::Signature {
        let message = Message::from_digest(digest);
        let mut signature = self.secp.sign_ecdsa(&message, &self.secret_key);
        signature.normalize_s();
        signature
    }

    /// Verify a signature over `digest` against this key pair's public key.
    #[must_use]
    pub fn verify_digest(&self, digest: [u8; 32], signature: &ecdsa::Signature) -> bool {
        let message = Message::from_digest(digest);
        self.secp
            .verify_ecdsa(&message, signature, &self.public_key.inner)
            .is_ok()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
