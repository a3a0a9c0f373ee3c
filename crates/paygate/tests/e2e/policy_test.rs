//! Integration tests for policy enforcement.
//!
//! These tests verify that policy rules are enforced at the request boundary:
//! - Transaction limit enforcement, including the unbounded zero limit
//! - Blacklist blocking
//! - Whitelist enforcement
//! - Rule ordering

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]

use paygate::backend::{Operation, Request, BLACKLIST, TX_SPEND_LIMIT, WHITELIST};
use paygate::storage::account_path;
use paygate::{Backend, RequestContext, Response};
use paygate_chain::codec;
use paygate_core::error::PaygateError;
use paygate_core::types::AccountPolicy;
use paygate_policy::{DefaultPolicyEngine, PolicyCheckResult};
use proptest::prelude::*;

use crate::common::{
    create_account, memory_backend, payment_request, satoshi_amount, unsigned_transaction,
};

/// A third party address that is not an account.
const CAROL: &str = "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn";

struct Fixture {
    backend: Backend,
    bob: String,
    unsigned_tx: String,
}

/// Create Bob, then Alice with `policy`.
async fn setup(policy: impl Fn(&str) -> Vec<(&'static str, String)>) -> Fixture {
    let backend = memory_backend();
    let bob = create_account(&backend, "bob", &[]).await;

    let fields = policy(&bob);
    let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    create_account(&backend, "alice", &borrowed).await;

    let unsigned_tx = codec::encode_hex(&unsigned_transaction(1, 1_000, &bob));
    Fixture {
        backend,
        bob,
        unsigned_tx,
    }
}

impl Fixture {
    async fn pay(&self, amount: u64) -> Result<Response, PaygateError> {
        self.backend
            .handle(
                &RequestContext::default(),
                payment_request("alice", "bob", amount, &self.unsigned_tx),
            )
            .await
    }

    async fn update_alice(&self, field: &str, value: &str) {
        self.backend
            .handle(
                &RequestContext::default(),
                Request::new(Operation::Update, account_path("alice")).with_field(field, value),
            )
            .await
            .expect("policy update should succeed");
    }
}

// ============================================================================
// Transaction Limit
// ============================================================================

#[tokio::test]
async fn test_limit_boundary() {
    let fx = setup(|_| vec![(TX_SPEND_LIMIT, "1000".to_string())]).await;

    fx.pay(1000).await.expect("amount equal to the limit is allowed");

    let err = fx.pay(1001).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "transaction amount (1001) is larger than the transactional limit (1000)"
    );
}

#[tokio::test]
async fn test_limit_denial_quotes_limit_as_stored() {
    let fx = setup(|_| vec![(TX_SPEND_LIMIT, "01000".to_string())]).await;

    fx.pay(1000).await.expect("leading zero does not change the limit");

    let err = fx.pay(1001).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "transaction amount (1001) is larger than the transactional limit (01000)"
    );
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_zero_limit_is_unbounded() {
    let fx = setup(|_| vec![(TX_SPEND_LIMIT, "0".to_string())]).await;
    fx.pay(2_100_000_000_000_000).await.expect("zero limit allows any amount");
}

#[tokio::test]
async fn test_default_account_is_unbounded() {
    let fx = setup(|_| Vec::new()).await;
    fx.pay(u64::MAX).await.expect("no limit set");
}

#[tokio::test]
async fn test_limit_update_takes_effect() {
    let fx = setup(|_| vec![(TX_SPEND_LIMIT, "1000".to_string())]).await;
    assert!(fx.pay(5000).await.is_err());

    fx.update_alice(TX_SPEND_LIMIT, "5000").await;
    fx.pay(5000).await.expect("raised limit");

    fx.update_alice(TX_SPEND_LIMIT, "").await;
    fx.pay(50_000).await.expect("cleared limit");
}

#[tokio::test]
async fn test_non_numeric_limit_is_rejected_at_create() {
    let backend = memory_backend();
    let err = backend
        .handle(
            &RequestContext::default(),
            Request::new(Operation::Create, account_path("alice"))
                .with_field(TX_SPEND_LIMIT, "lots"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PaygateError::InvalidField { .. }));
    assert_eq!(err.status_code(), 400);
}

// ============================================================================
// Blacklist and Whitelist
// ============================================================================

#[tokio::test]
async fn test_blacklist_blocks_destination() {
    let fx = setup(|bob| vec![(BLACKLIST, format!("{CAROL},{bob}"))]).await;

    let err = fx.pay(1).await.unwrap_err();
    assert_eq!(err.to_string(), format!("{} is blacklisted", fx.bob));
}

#[tokio::test]
async fn test_blacklist_takes_precedence_over_whitelist() {
    let fx = setup(|bob| vec![(BLACKLIST, bob.to_string()), (WHITELIST, bob.to_string())]).await;

    let err = fx.pay(1).await.unwrap_err();
    assert_eq!(err.to_string(), format!("{} is blacklisted", fx.bob));
}

#[tokio::test]
async fn test_whitelist_is_exclusive() {
    let fx = setup(|_| vec![(WHITELIST, CAROL.to_string())]).await;

    let err = fx.pay(1).await.unwrap_err();
    assert_eq!(err.to_string(), format!("{} is not in the whitelist", fx.bob));

    fx.update_alice(WHITELIST, &format!("{CAROL},{}", fx.bob)).await;
    fx.pay(1).await.expect("whitelisted destination");
}

#[tokio::test]
async fn test_limit_checked_before_lists() {
    let fx = setup(|bob| {
        vec![
            (TX_SPEND_LIMIT, "10".to_string()),
            (BLACKLIST, bob.to_string()),
        ]
    })
    .await;

    let err = fx.pay(11).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "transaction amount (11) is larger than the transactional limit (10)"
    );
}

#[tokio::test]
async fn test_membership_uses_raw_address_string() {
    let fx = setup(|bob| vec![(BLACKLIST, bob.to_lowercase())]).await;
    fx.pay(1).await.expect("a case-folded entry does not match");
}

#[tokio::test]
async fn test_clearing_blacklist_allows_payment() {
    let fx = setup(|bob| vec![(BLACKLIST, bob.to_string())]).await;
    assert!(fx.pay(1).await.is_err());

    fx.update_alice(BLACKLIST, "").await;
    fx.pay(1).await.expect("blacklist cleared");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_limit_is_an_upper_bound(limit in 1u64..=1_000_000_000, amount in satoshi_amount()) {
        let policy = AccountPolicy::new(limit.to_string());
        let result = DefaultPolicyEngine::new().evaluate(&policy, amount, CAROL);

        if amount > limit {
            prop_assert_eq!(
                result,
                PolicyCheckResult::DeniedExceedsTransactionLimit {
                    amount,
                    limit: limit.to_string(),
                }
            );
        } else {
            prop_assert_eq!(result, PolicyCheckResult::Allowed);
        }
    }

    #[test]
    fn prop_zero_limit_allows_everything(amount in any::<u64>()) {
        let policy = AccountPolicy::new("0");
        prop_assert!(DefaultPolicyEngine::new().evaluate(&policy, amount, CAROL).is_allowed());
    }

    #[test]
    fn prop_unparsable_limit_is_unset(limit in "[a-z ]{0,8}", amount in any::<u64>()) {
        let policy = AccountPolicy::new(limit);
        prop_assert!(DefaultPolicyEngine::new().evaluate(&policy, amount, CAROL).is_allowed());
    }
}
