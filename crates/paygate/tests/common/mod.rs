//! # Test Utilities for Paygate
//!
//! Shared helpers for the integration tests.
//!
//! ## Functions
//!
//! - [`load_fixture`] - Load a JSON fixture file from the fixtures directory
//! - [`temp_data_dir`] - Create an isolated temporary directory for test data
//! - [`memory_backend`] / [`file_backend`] - Backends over the two stores
//! - [`create_account`] - Create an account through the backend, returning its address
//! - [`unsigned_transaction`] - Build an unsigned legacy transaction
//!
//! ## Proptest Strategies
//!
//! - [`satoshi_amount`] - Amounts up to the 21M BTC supply
//! - [`account_name`] - Valid account names

#![allow(dead_code)]
// Allow expect() in test utilities since panicking on setup failures is acceptable in tests
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use paygate::backend::{Operation, Request, PAYMENTS_PATH};
use paygate::payments::fields;
use paygate::storage::account_path;
use paygate::{Backend, FileAccountStore, MemoryAccountStore, RequestContext};
use paygate_core::network::NetworkParameters;
use proptest::prelude::*;
use tempfile::TempDir;

/// Fixture holding a two-input unsigned transaction.
pub const UNSIGNED_P2PKH_FIXTURE: &str = "bitcoin/unsigned_p2pkh.json";

/// Error type for fixture loading operations.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// The fixture file could not be found.
    #[error("Fixture not found: {0}")]
    NotFound(String),

    /// The fixture file could not be read.
    #[error("Failed to read fixture: {0}")]
    ReadError(#[from] std::io::Error),

    /// The fixture JSON could not be parsed.
    #[error("Failed to parse fixture JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Load a JSON fixture file from the workspace `tests/fixtures/` directory.
///
/// # Examples
///
/// ```ignore
/// let fixture = load_fixture("bitcoin/unsigned_p2pkh.json")?;
/// let raw_tx = fixture["unsigned_tx"].as_str().unwrap();
/// ```
pub fn load_fixture(path: &str) -> Result<serde_json::Value, FixtureError> {
    let fixture_path = fixtures_dir().join(path);

    if !fixture_path.exists() {
        return Err(FixtureError::NotFound(fixture_path.display().to_string()));
    }

    let content = std::fs::read_to_string(&fixture_path)?;
    Ok(serde_json::from_str(&content)?)
}

fn fixtures_dir() -> PathBuf {
    // crates/paygate -> crates -> workspace
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(manifest_dir)
        .parent()
        .and_then(Path::parent)
        .map_or_else(
            || PathBuf::from("tests/fixtures"),
            |p| p.join("tests").join("fixtures"),
        )
}

/// The unsigned transaction hex from [`UNSIGNED_P2PKH_FIXTURE`].
///
/// # Panics
///
/// Panics if the fixture is missing or malformed.
#[must_use]
pub fn fixture_unsigned_tx() -> String {
    let fixture = load_fixture(UNSIGNED_P2PKH_FIXTURE).expect("unsigned transaction fixture");
    fixture["unsigned_tx"]
        .as_str()
        .expect("fixture should have 'unsigned_tx'")
        .to_string()
}

/// Create a temporary directory for test data, removed on drop.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn temp_data_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("paygate-test-")
        .tempdir()
        .expect("Failed to create temporary directory for test")
}

// =============================================================================
// Backends and Requests
// =============================================================================

/// The network every integration test runs on.
#[must_use]
pub fn network() -> NetworkParameters {
    NetworkParameters::testnet()
}

/// A backend over an in-memory store.
#[must_use]
pub fn memory_backend() -> Backend {
    Backend::new(Arc::new(MemoryAccountStore::new()), network())
}

/// A backend over a file store rooted at `dir`.
///
/// # Panics
///
/// Panics if the store directory cannot be created.
#[must_use]
pub fn file_backend(dir: &Path) -> Backend {
    let store = FileAccountStore::with_path(dir).expect("file account store");
    Backend::new(Arc::new(store), network())
}

/// Create account `name` with the given policy fields and return its address.
///
/// # Panics
///
/// Panics if the backend rejects the request.
pub async fn create_account(backend: &Backend, name: &str, policy: &[(&str, &str)]) -> String {
    let mut request = Request::new(Operation::Create, account_path(name));
    for (field, value) in policy {
        request = request.with_field(*field, *value);
    }

    let response = backend
        .handle(&RequestContext::default(), request)
        .await
        .expect("account creation should succeed");

    response
        .get_str("address")
        .expect("response should carry the address")
        .to_string()
}

/// A payment request from `source` to `destination`.
#[must_use]
pub fn payment_request(source: &str, destination: &str, amount: u64, unsigned_tx: &str) -> Request {
    Request::new(Operation::Create, PAYMENTS_PATH)
        .with_field(fields::SOURCE, source)
        .with_field(fields::DESTINATION, destination)
        .with_field(fields::AMOUNT, amount.to_string())
        .with_field(fields::UNSIGNED_TX, unsigned_tx)
}

// =============================================================================
// Transactions
// =============================================================================

/// Build an unsigned legacy transaction with `inputs` inputs and one output
/// paying `value` satoshis to `destination`.
///
/// # Panics
///
/// Panics if `destination` is not a valid testnet address.
#[must_use]
pub fn unsigned_transaction(inputs: usize, value: u64, destination: &str) -> Transaction {
    let input = (0..inputs)
        .map(|i| {
            let mut txid = [0u8; 32];
            txid[0] = u8::try_from(i % 256).expect("fits in a byte");
            txid[31] = 0x42;
            TxIn {
                previous_output: OutPoint::new(
                    Txid::from_byte_array(txid),
                    u32::try_from(i).expect("input index fits in u32"),
                ),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }
        })
        .collect();

    Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input,
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey: script_pubkey(destination),
        }],
    }
}

/// The locking script for a testnet `address`.
///
/// # Panics
///
/// Panics if `address` is not a valid testnet address.
#[must_use]
pub fn script_pubkey(address: &str) -> ScriptBuf {
    Address::from_str(address)
        .expect("valid address")
        .require_network(network().network())
        .expect("testnet address")
        .script_pubkey()
}

// =============================================================================
// Proptest Strategies
// =============================================================================

/// Generate an amount in satoshis, up to the 21M BTC supply.
pub fn satoshi_amount() -> impl Strategy<Value = u64> {
    0u64..=2_100_000_000_000_000u64
}

/// Generate a valid account name.
pub fn account_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9_-]{0,31}"
}
