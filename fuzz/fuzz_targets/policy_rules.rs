//! Fuzz target for policy rules evaluation.
//!
//! Builds an account policy from arbitrary input, evaluates a payment against
//! it and checks the verdict against the rule order: limit, blacklist,
//! whitelist.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run policy_rules
//! ```

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use paygate_core::types::{parse_address_list, AccountPolicy};
use paygate_policy::{DefaultPolicyEngine, PolicyCheckResult};

#[derive(Debug, Arbitrary)]
struct PolicyFuzzInput {
    /// Payment amount in satoshis
    amount: u64,
    /// Numeric limit, or a raw string when absent
    limit: Option<u64>,
    raw_limit: String,
    /// Indices into the predefined addresses
    blacklist_indices: Vec<u8>,
    whitelist_indices: Vec<u8>,
    destination_index: u8,
    /// Free-form comma-separated list
    raw_list: String,
}

/// Predefined addresses for whitelist/blacklist testing
const PREDEFINED_ADDRESSES: [&str; 6] = [
    "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn",
    "mkHS9ne12qx9pS9VojpwU5xtRd4T7X7ZUt",
    "n3GNqMveyvaPvUbH469vDRadqpJMPc84JA",
    "2N8hwP1WmJrFF5QWABn38y63uYLhnJYJYTF",
    "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx",
    "MIPCBBFG9GMICH81KJ8TQQDGOZUB1ZJRFN",
];

fn pick(indices: &[u8]) -> Vec<String> {
    indices
        .iter()
        .map(|&i| PREDEFINED_ADDRESSES[usize::from(i) % PREDEFINED_ADDRESSES.len()].to_string())
        .collect()
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let Ok(input) = PolicyFuzzInput::arbitrary(&mut unstructured) else {
        return;
    };

    // List parsing never yields empty or padded entries
    for entry in parse_address_list(&input.raw_list) {
        assert!(!entry.is_empty());
        assert_eq!(entry, entry.trim());
    }

    let limit = input
        .limit
        .map_or_else(|| input.raw_limit.clone(), |l| l.to_string());
    let blacklist = pick(&input.blacklist_indices);
    let whitelist = pick(&input.whitelist_indices);
    let destination =
        PREDEFINED_ADDRESSES[usize::from(input.destination_index) % PREDEFINED_ADDRESSES.len()];

    let policy = AccountPolicy::new(limit)
        .with_blacklist(blacklist.clone())
        .with_whitelist(whitelist.clone());

    let result = DefaultPolicyEngine::new().evaluate(&policy, input.amount, destination);

    let over_limit = policy.spend_limit().is_some_and(|l| input.amount > l);
    let blacklisted = blacklist.iter().any(|a| a == destination);
    let not_whitelisted = !whitelist.is_empty() && !whitelist.iter().any(|a| a == destination);

    match result {
        PolicyCheckResult::DeniedExceedsTransactionLimit { amount, ref limit } => {
            assert!(over_limit);
            assert_eq!(amount, input.amount);
            assert_eq!(limit, &policy.tx_spend_limit);
        }
        PolicyCheckResult::DeniedBlacklisted { ref address } => {
            assert!(!over_limit && blacklisted);
            assert_eq!(address, destination);
        }
        PolicyCheckResult::DeniedNotWhitelisted { ref address } => {
            assert!(!over_limit && !blacklisted && not_whitelisted);
            assert_eq!(address, destination);
        }
        PolicyCheckResult::Allowed => {
            assert!(!over_limit && !blacklisted && !not_whitelisted);
        }
    }

    assert_eq!(result.is_denied(), result.reason().is_some());
});
