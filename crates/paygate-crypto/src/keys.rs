//! Secret key type with secure memory handling.
//!
//! Key material held by [`SecretKey`] is:
//! - Zeroized on drop
//! - Never exposed in debug output
//! - Compared in constant time
//! - Moved, never cloned
//!
//! Keys are persisted as WIF strings. [`SecretKey::from_wif`] and
//! [`SecretKey::to_wif`] convert at that boundary; the WIF text produced by
//! `to_wif` is wrapped in [`Zeroizing`] so it is wiped as well.

use bitcoin::secp256k1;
use bitcoin::PrivateKey;
use paygate_core::network::NetworkParameters;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The length of a secret key in bytes.
pub const SECRET_KEY_LEN: usize = 32;

/// A 32-byte secp256k1 secret key with automatic zeroization.
///
/// **Important**: This type intentionally does not implement `Clone`.
/// Keys must be moved, not copied.
///
/// ```
/// use paygate_crypto::keys::SecretKey;
///
/// let key = SecretKey::generate();
/// assert_eq!(format!("{key:?}"), "SecretKey([REDACTED])");
/// drop(key); // zeroized here
/// ```
///
/// ```compile_fail
/// use paygate_crypto::keys::SecretKey;
///
/// let key = SecretKey::generate();
/// let _copy = key.clone();
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; SECRET_KEY_LEN],
}

impl SecretKey {
    /// Create a new `SecretKey` from raw bytes.
    ///
    /// The input bytes are copied; the caller should zeroize its copy.
    /// No curve validity check is made here, see [`SecretKey::into_secp256k1`].
    #[must_use]
    pub const fn new(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generate a new random, valid secp256k1 secret key from `OsRng`.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_KEY_LEN];
        loop {
            rand::rngs::OsRng.fill_bytes(&mut bytes);
            if let Ok(mut scalar) = secp256k1::SecretKey::from_slice(&bytes) {
                scalar.non_secure_erase();
                let key = Self { bytes };
                bytes.zeroize();
                return key;
            }
        }
    }

    /// Decode a key from Wallet Import Format.
    ///
    /// The network and compression flag encoded in the WIF are not retained:
    /// the signing network is injected separately and public keys are always
    /// used in compressed form.
    ///
    /// # Errors
    ///
    /// Returns [`SecretKeyError::InvalidWif`] if the string is not a valid WIF.
    pub fn from_wif(wif: &str) -> Result<Self, SecretKeyError> {
        let mut private = PrivateKey::from_wif(wif).map_err(|_| SecretKeyError::InvalidWif)?;
        let key = Self {
            bytes: private.inner.secret_bytes(),
        };
        private.inner.non_secure_erase();
        Ok(key)
    }

    /// Encode the key as a compressed-pubkey WIF for `network`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretKeyError::InvalidKey`] if the bytes are not a valid scalar.
    pub fn to_wif(&self, network: NetworkParameters) -> Result<Zeroizing<String>, SecretKeyError> {
        let mut scalar = secp256k1::SecretKey::from_slice(&self.bytes)
            .map_err(|_| SecretKeyError::InvalidKey)?;
        let mut private = PrivateKey::new(scalar, network.network());
        let wif = Zeroizing::new(private.to_wif());
        private.inner.non_secure_erase();
        scalar.non_secure_erase();
        Ok(wif)
    }

    /// Expose the raw bytes for cryptographic operations.
    ///
    /// The returned reference must not be stored or copied beyond the
    /// immediate operation.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.bytes
    }

    /// Always 32.
    #[must_use]
    pub const fn len(&self) -> usize {
        SECRET_KEY_LEN
    }

    /// Always `false`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Convert into a `secp256k1::SecretKey`, consuming `self`.
    ///
    /// The returned key is `Copy`; callers erase it with
    /// `non_secure_erase` once done (see [`Secp256k1KeyPair`]).
    ///
    /// # Errors
    ///
    /// Returns [`SecretKeyError::InvalidKey`] if the value is zero or not
    /// below the curve order.
    ///
    /// [`Secp256k1KeyPair`]: crate::keypair::Secp256k1KeyPair
    pub fn into_secp256k1(self) -> Result<secp256k1::SecretKey, SecretKeyError> {
        secp256k1::SecretKey::from_slice(&self.bytes).map_err(|_| SecretKeyError::InvalidKey)
    }
}

/// Errors related to secret key operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKeyError {
    /// The provided bytes do not represent a valid secret key.
    InvalidKey,
    /// The string is not a valid Wallet Import Format key.
    InvalidWif,
}

impl std::fmt::Display for SecretKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid secret key bytes"),
            Self::InvalidWif => write!(f, "invalid WIF encoding"),
        }
    }
}

impl std::error::Error for SecretKeyError {}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SecretKey {}

impl From<[u8; SECRET_KEY_LEN]> for SecretKey {
    fn from(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self::new(bytes)
    }
}
