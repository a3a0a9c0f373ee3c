//! End-to-end tests for the payment flow.
//!
//! Accounts are created through the backend, a payment is signed, and the
//! signed transaction is checked with the script engine:
//!
//! 1. Create source and destination accounts
//! 2. Submit an unsigned transaction as a payment
//! 3. Decode the signed result and verify every input

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]

use paygate::backend::TX_SPEND_LIMIT;
use paygate::{Backend, RequestContext, Response};
use paygate_chain::{codec, SigningEngine, TransactionSummary};
use paygate_core::error::PaygateError;

use crate::common::{
    create_account, file_backend, fixture_unsigned_tx, load_fixture, memory_backend, network,
    payment_request, script_pubkey, temp_data_dir, unsigned_transaction, UNSIGNED_P2PKH_FIXTURE,
};

async fn pay(
    backend: &Backend,
    amount: u64,
    unsigned_tx: &str,
) -> Result<Response, PaygateError> {
    backend
        .handle(
            &RequestContext::default(),
            payment_request("alice", "bob", amount, unsigned_tx),
        )
        .await
}

/// Alice with a limit of 1000 and no lists, Bob with defaults.
async fn alice_and_bob(backend: &Backend) -> (String, String) {
    let alice = create_account(backend, "alice", &[(TX_SPEND_LIMIT, "1000")]).await;
    let bob = create_account(backend, "bob", &[]).await;
    (alice, bob)
}

fn assert_all_inputs_verify(signed_hex: &str, source_address: &str) {
    let tx = codec::decode_hex(signed_hex).expect("signed transaction should decode");
    let engine = SigningEngine::new(network());
    let script = script_pubkey(source_address);

    assert!(!tx.input.is_empty());
    for index in 0..tx.input.len() {
        engine
            .verify_input(&tx, index, &script)
            .unwrap_or_else(|e| panic!("input {index} should verify: {e}"));
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_payment_within_limit_is_signed() {
    let backend = memory_backend();
    let (alice, bob) = alice_and_bob(&backend).await;
    let unsigned = codec::encode_hex(&unsigned_transaction(1, 35, &bob));

    let response = pay(&backend, 35, &unsigned).await.expect("payment should succeed");

    let hash = response.get_str("transaction_hash").expect("transaction_hash");
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));

    let signed = response.get_str("signed_transaction").expect("signed_transaction");
    assert!(!signed.is_empty());
    assert_ne!(signed, unsigned);

    assert_eq!(response.get_str("source_address"), Some(alice.as_str()));
    assert_all_inputs_verify(signed, &alice);
}

#[tokio::test]
async fn test_payment_over_limit_is_denied_verbatim() {
    let backend = memory_backend();
    let (_, bob) = alice_and_bob(&backend).await;
    let unsigned = codec::encode_hex(&unsigned_transaction(1, 1001, &bob));

    let err = pay(&backend, 1001, &unsigned).await.unwrap_err();

    assert!(matches!(err, PaygateError::PolicyDenied { .. }));
    assert_eq!(err.status_code(), 400);
    assert_eq!(
        err.to_string(),
        "transaction amount (1001) is larger than the transactional limit (1000)"
    );
}

#[tokio::test]
async fn test_blacklisted_destination_is_denied() {
    let backend = memory_backend();
    let bob = create_account(&backend, "bob", &[]).await;
    create_account(
        &backend,
        "alice",
        &[(TX_SPEND_LIMIT, "1000"), ("blacklist", bob.as_str())],
    )
    .await;
    let unsigned = codec::encode_hex(&unsigned_transaction(1, 35, &bob));

    let err = pay(&backend, 35, &unsigned).await.unwrap_err();

    assert_eq!(err.to_string(), format!("{bob} is blacklisted"));
    assert_eq!(err.status_code(), 400);
}

// ============================================================================
// Signatures
// ============================================================================

#[tokio::test]
async fn test_fixture_transaction_signs_every_input() {
    let backend = memory_backend();
    let (alice, _) = alice_and_bob(&backend).await;

    let fixture = load_fixture(UNSIGNED_P2PKH_FIXTURE).expect("fixture");
    let response = pay(&backend, 500, &fixture_unsigned_tx())
        .await
        .expect("payment should succeed");

    let signed = response.get_str("signed_transaction").expect("signed_transaction");
    let summary = TransactionSummary::from_transaction(
        &codec::decode_hex(signed).expect("decode"),
        network(),
    );

    assert_eq!(
        summary.inputs.len() as u64,
        fixture["expected"]["input_count"].as_u64().expect("input_count")
    );
    assert_eq!(
        summary.total_output,
        fixture["expected"]["output_value"].as_u64().expect("output_value")
    );
    assert!(summary.is_fully_signed());
    assert_all_inputs_verify(signed, &alice);
}

#[tokio::test]
async fn test_flipped_signature_byte_fails_verification() {
    let backend = memory_backend();
    let (alice, bob) = alice_and_bob(&backend).await;
    let unsigned = codec::encode_hex(&unsigned_transaction(2, 100, &bob));

    let response = pay(&backend, 100, &unsigned).await.expect("payment");
    let signed = codec::decode_hex(response.get_str("signed_transaction").expect("signed"))
        .expect("decode");

    let engine = SigningEngine::new(network());
    let script = script_pubkey(&alice);

    for index in 0..signed.input.len() {
        let script_sig_len = signed.input[index].script_sig.len();
        for position in 0..script_sig_len {
            let mut tampered = signed.clone();
            let mut bytes = tampered.input[index].script_sig.to_bytes();
            bytes[position] ^= 0x01;
            tampered.input[index].script_sig = bytes.into();

            assert!(
                engine.verify_input(&tampered, index, &script).is_err(),
                "flipping byte {position} of input {index} should break verification"
            );
        }
    }
}

#[tokio::test]
async fn test_signed_hash_matches_encoded_transaction() {
    let backend = memory_backend();
    let (_, bob) = alice_and_bob(&backend).await;
    let unsigned = codec::encode_hex(&unsigned_transaction(3, 10, &bob));

    let response = pay(&backend, 10, &unsigned).await.expect("payment");
    let signed = codec::decode_hex(response.get_str("signed_transaction").expect("signed"))
        .expect("decode");

    assert_eq!(
        response.get_str("transaction_hash"),
        Some(codec::txid(&signed).as_str())
    );
    assert_eq!(signed.input.len(), 3);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_accounts_survive_backend_restart() {
    let dir = temp_data_dir();
    let (alice, bob) = {
        let backend = file_backend(dir.path());
        alice_and_bob(&backend).await
    };

    let backend = file_backend(dir.path());
    let unsigned = codec::encode_hex(&unsigned_transaction(1, 1000, &bob));
    let response = pay(&backend, 1000, &unsigned)
        .await
        .expect("payment after restart");

    assert_eq!(response.get_str("source_address"), Some(alice.as_str()));
    assert_all_inputs_verify(
        response.get_str("signed_transaction").expect("signed"),
        &alice,
    );
}

#[tokio::test]
async fn test_unknown_source_and_destination() {
    let backend = memory_backend();
    let bob = create_account(&backend, "bob", &[]).await;
    let unsigned = codec::encode_hex(&unsigned_transaction(1, 1, &bob));

    let err = pay(&backend, 1, &unsigned).await.unwrap_err();
    assert!(matches!(err, PaygateError::SourceNotFound));

    create_account(&backend, "alice", &[]).await;
    let err = backend
        .handle(
            &RequestContext::default(),
            payment_request("alice", "carol", 1, &unsigned),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PaygateError::DestinationNotFound));
}

#[tokio::test]
async fn test_truncated_transaction_is_client_error() {
    let backend = memory_backend();
    alice_and_bob(&backend).await;

    let fixture_hex = fixture_unsigned_tx();
    let truncated = &fixture_hex[..fixture_hex.len() - 10];

    let err = pay(&backend, 1, truncated).await.unwrap_err();
    assert!(matches!(err, PaygateError::Decode(_)));
    assert_eq!(err.status_code(), 400);
}
