//! Policy engine for per-account payment rules.
//!
//! # Rule Evaluation Order
//!
//! Rules are evaluated in strict order and the first denial wins:
//!
//! 1. **Transaction Limit** - If the account has a positive limit and the amount exceeds it, DENY.
//! 2. **Blacklist** - If the destination address is blacklisted, DENY.
//! 3. **Whitelist** - If the whitelist is non-empty and does not contain the destination, DENY.
//! 4. **Allow** - If all checks pass, the payment is ALLOWED.
//!
//! Addresses are compared as raw strings; no normalization is applied.
//!
//! # Example
//!
//! ```
//! use paygate_core::types::{AccountPolicy, PolicyResult};
//! use paygate_policy::engine::{DefaultPolicyEngine, PolicyEngine};
//!
//! let policy = AccountPolicy::new("1000");
//! let engine = DefaultPolicyEngine::new();
//!
//! assert!(engine.check(&policy, 35, "mkHS9ne12qx9pS9VojpwU5xtRd4T7X7ZUt").is_allowed());
//! assert_eq!(
//!     engine.check(&policy, 1001, "mkHS9ne12qx9pS9VojpwU5xtRd4T7X7ZUt"),
//!     PolicyResult::denied(
//!         "tx_limit",
//!         "transaction amount (1001) is larger than the transactional limit (1000)",
//!     )
//! );
//! ```

use paygate_core::types::{AccountPolicy, PolicyResult};

/// Evaluates a payment against an account's policy.
///
/// Implementations must be pure: the same inputs always produce the same
/// result, and evaluation never fails. Denial is a result, not an error.
pub trait PolicyEngine: Send + Sync {
    /// Check a payment of `amount` satoshis to `destination` against `policy`.
    fn check(&self, policy: &AccountPolicy, amount: u64, destination: &str) -> PolicyResult;
}

/// Detailed result of a policy check, before conversion into [`PolicyResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCheckResult {
    /// The payment passed all checks.
    Allowed,

    /// The amount is above the account's transaction limit.
    DeniedExceedsTransactionLimit {
        /// The requested amount.
        amount: u64,
        /// The account's limit, as stored on the account.
        limit: String,
    },

    /// The destination is on the account's blacklist.
    DeniedBlacklisted {
        /// The destination address.
        address: String,
    },

    /// The account has a whitelist and the destination is not on it.
    DeniedNotWhitelisted {
        /// The destination address.
        address: String,
    },
}

impl PolicyCheckResult {
    /// Returns `true` if the payment is allowed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Returns `true` if the payment is denied.
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    /// Name of the rule that denied the payment.
    #[must_use]
    pub const fn rule_name(&self) -> Option<&'static str> {
        match self {
            Self::Allowed => None,
            Self::DeniedExceedsTransactionLimit { .. } => Some("tx_limit"),
            Self::DeniedBlacklisted { .. } => Some("blacklist"),
            Self::DeniedNotWhitelisted { .. } => Some("whitelist"),
        }
    }

    /// Human-readable denial reason, as returned to callers.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Allowed => None,
            Self::DeniedExceedsTransactionLimit { amount, limit } => Some(format!(
                "transaction amount ({amount}) is larger than the transactional limit ({limit})"
            )),
            Self::DeniedBlacklisted { address } => Some(format!("{address} is blacklisted")),
            Self::DeniedNotWhitelisted { address } => {
                Some(format!("{address} is not in the whitelist"))
            }
        }
    }
}

impl From<PolicyCheckResult> for PolicyResult {
    fn from(result: PolicyCheckResult) -> Self {
        match (result.rule_name(), result.reason()) {
            (Some(rule), Some(reason)) => Self::Denied {
                rule: rule.to_string(),
                reason,
            },
            _ => Self::Allowed,
        }
    }
}

/// The standard limit, blacklist, whitelist engine.
///
/// The engine holds no state; the policy is supplied per call because each
/// source account carries its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicyEngine;

impl DefaultPolicyEngine {
    /// Create a new engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Run the checks in order and return the detailed result.
    #[must_use]
    pub fn evaluate(
        &self,
        policy: &AccountPolicy,
        amount: u64,
        destination: &str,
    ) -> PolicyCheckResult {
        // 1. Check transaction limit
        if let Some(result) = Self::check_transaction_limit(policy, amount) {
            return result;
        }

        // 2. Check blacklist
        if let Some(result) = Self::check_blacklist(policy, destination) {
            return result;
        }

        // 3. Check whitelist (if non-empty)
        if let Some(result) = Self::check_whitelist(policy, destination) {
            return result;
        }

        // 4. All checks passed
        PolicyCheckResult::Allowed
    }

    fn check_transaction_limit(policy: &AccountPolicy, amount: u64) -> Option<PolicyCheckResult> {
        let limit = policy.spend_limit()?;

        if amount > limit {
            return Some(PolicyCheckResult::DeniedExceedsTransactionLimit {
                amount,
                limit: policy.tx_spend_limit.clone(),
            });
        }

        None
    }

    fn check_blacklist(policy: &AccountPolicy, destination: &str) -> Option<PolicyCheckResult> {
        if policy.blacklist.iter().any(|entry| entry == destination) {
            return Some(PolicyCheckResult::DeniedBlacklisted {
                address: destination.to_string(),
            });
        }

        None
    }

    fn check_whitelist(policy: &AccountPolicy, destination: &str) -> Option<PolicyCheckResult> {
        if policy.whitelist.is_empty() {
            return None;
        }

        if !policy.whitelist.iter().any(|entry| entry == destination) {
            return Some(PolicyCheckResult::DeniedNotWhitelisted {
                address: destination.to_string(),
            });
        }

        None
    }
}

impl PolicyEngine for DefaultPolicyEngine {
    fn check(&self, policy: &AccountPolicy, amount: u64, destination: &str) -> PolicyResult {
        let result = self.evaluate(policy, amount, destination);

        if let Some(rule) = result.rule_name() {
            tracing::debug!(rule, destination, amount, "payment denied by policy");
        }

        result.into()
    }
}
