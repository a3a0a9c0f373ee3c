//! Core types for the paygate signing service.
//!
//! - [`AccountPolicy`] - Spend limit, blacklist and whitelist attached to an account
//! - [`PaymentRequest`] - A validated request to sign a payment
//! - [`SignedPayment`] - The result of a successful payment
//! - [`PolicyResult`] - Result of policy evaluation
//!
//! # Examples
//!
//! ```
//! use paygate_core::types::AccountPolicy;
//!
//! let policy = AccountPolicy::new("1000")
//!     .with_blacklist(["mkHS9ne12qx9pS9VojpwU5xtRd4T7X7ZUt"]);
//!
//! assert_eq!(policy.spend_limit(), Some(1000));
//! assert!(policy.whitelist.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-account spending policy.
///
/// The spend limit is kept in its textual form, as stored. A value that does
/// not parse as a strictly positive integer means the account has no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPolicy {
    /// Per-transaction spend limit in satoshis, as stored.
    #[serde(default)]
    pub tx_spend_limit: String,

    /// Destination addresses that are always denied.
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// If non-empty, the only destination addresses that are allowed.
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl AccountPolicy {
    /// Create a policy with the given spend limit and empty lists.
    #[must_use]
    pub fn new(tx_spend_limit: impl Into<String>) -> Self {
        Self {
            tx_spend_limit: tx_spend_limit.into(),
            blacklist: Vec::new(),
            whitelist: Vec::new(),
        }
    }

    /// Replace the blacklist.
    #[must_use]
    pub fn with_blacklist<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the whitelist.
    #[must_use]
    pub fn with_whitelist<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// The effective spend limit, or `None` if the account is unbounded.
    ///
    /// A limit of `0`, an empty string, or anything that is not a
    /// non-negative integer is treated as unbounded.
    ///
    /// ```
    /// use paygate_core::types::AccountPolicy;
    ///
    /// assert_eq!(AccountPolicy::new("1000").spend_limit(), Some(1000));
    /// assert_eq!(AccountPolicy::new("0").spend_limit(), None);
    /// assert_eq!(AccountPolicy::new("").spend_limit(), None);
    /// assert_eq!(AccountPolicy::new("lots").spend_limit(), None);
    /// ```
    #[must_use]
    pub fn spend_limit(&self) -> Option<u64> {
        match self.tx_spend_limit.trim().parse::<u64>() {
            Ok(0) | Err(_) => None,
            Ok(limit) => Some(limit),
        }
    }
}

/// Split a comma-separated address list, trimming whitespace and dropping empty entries.
///
/// ```
/// use paygate_core::types::parse_address_list;
///
/// assert_eq!(parse_address_list(" a, b,,c "), vec!["a", "b", "c"]);
/// assert!(parse_address_list("").is_empty());
/// ```
#[must_use]
pub fn parse_address_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// A validated request to sign a payment from one managed account to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Name of the paying account.
    pub source: String,

    /// Name of the receiving account.
    pub destination: String,

    /// Hex-encoded unsigned transaction.
    pub unsigned_tx: String,

    /// Amount in satoshis, used for the spend-limit check.
    pub amount: u64,

    /// Co-signers named by the caller. Accepted and carried, never acted upon.
    #[serde(default)]
    pub additional_signers: Vec<String>,
}

/// The outcome of a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayment {
    /// P2PKH address of the source account.
    pub source_address: String,

    /// Transaction id of the signed transaction (64 lowercase hex characters).
    pub transaction_hash: String,

    /// Hex serialization of the signed transaction.
    pub signed_transaction: String,
}

/// Result of policy evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyResult {
    /// The payment is allowed by all policy rules.
    #[default]
    Allowed,

    /// The payment is denied by a policy rule.
    Denied {
        /// The name of the rule that denied the payment.
        ///
        /// One of `tx_limit`, `blacklist`, `whitelist`.
        rule: String,

        /// Human-readable explanation of why the payment was denied.
        reason: String,
    },
}

impl PolicyResult {
    /// Returns `true` if the policy allows this payment.
    ///
    /// ```
    /// use paygate_core::types::PolicyResult;
    ///
    /// assert!(PolicyResult::Allowed.is_allowed());
    /// assert!(!PolicyResult::denied("blacklist", "x is blacklisted").is_allowed());
    /// ```
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Returns `true` if the policy denies this payment.
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    /// Creates a new denied result.
    #[must_use]
    pub fn denied(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Denied {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Returns the denial rule and reason if denied, or `None` if allowed.
    #[must_use]
    pub fn denial_info(&self) -> Option<(&str, &str)> {
        match self {
            Self::Allowed => None,
            Self::Denied { rule, reason } => Some((rule.as_str(), reason.as_str())),
        }
    }
}

impl fmt::Display for PolicyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Denied { rule, reason } => write!(f, "denied by {rule}: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    mod account_policy_tests {
        use super::*;

        #[test]
        fn test_spend_limit_positive() {
            assert_eq!(AccountPolicy::new("1").spend_limit(), Some(1));
            assert_eq!(AccountPolicy::new("1000").spend_limit(), Some(1000));
            assert_eq!(
                AccountPolicy::new("18446744073709551615").spend_limit(),
                Some(u64::MAX)
            );
        }

        #[test]
        fn test_spend_limit_unbounded_values() {
            for raw in ["", "0", "-5", "12.5", "abc", "18446744073709551616"] {
                assert_eq!(AccountPolicy::new(raw).spend_limit(), None, "for {raw:?}");
            }
        }

        #[test]
        fn test_default_policy_is_unrestricted() {
            let policy = AccountPolicy::default();
            assert_eq!(policy.spend_limit(), None);
            assert!(policy.blacklist.is_empty());
            assert!(policy.whitelist.is_empty());
        }

        #[test]
        fn test_builders_replace_lists() {
            let policy = AccountPolicy::new("10")
                .with_blacklist(["a", "b"])
                .with_whitelist(vec!["c".to_string()]);
            assert_eq!(policy.blacklist, vec!["a", "b"]);
            assert_eq!(policy.whitelist, vec!["c"]);
        }

        #[test]
        fn test_serde_missing_fields_default() {
            let policy: AccountPolicy = serde_json::from_str("{}").unwrap();
            assert_eq!(policy, AccountPolicy::default());
        }
    }

    mod address_list_tests {
        use super::*;

        #[test]
        fn test_parse_address_list_keeps_order() {
            assert_eq!(parse_address_list("z,y,x"), vec!["z", "y", "x"]);
        }

        #[test]
        fn test_parse_address_list_only_separators() {
            assert!(parse_address_list(" , ,").is_empty());
        }
    }

    mod policy_result_tests {
        use super::*;

        #[test]
        fn test_default_is_allowed() {
            assert_eq!(PolicyResult::default(), PolicyResult::Allowed);
        }

        #[test]
        fn test_denial_info() {
            let result = PolicyResult::denied("whitelist", "b is not in the whitelist");
            assert!(result.is_denied());
            assert_eq!(
                result.denial_info(),
                Some(("whitelist", "b is not in the whitelist"))
            );
            assert!(PolicyResult::Allowed.denial_info().is_none());
        }

        #[test]
        fn test_display() {
            assert_eq!(PolicyResult::Allowed.to_string(), "allowed");
            assert_eq!(
                PolicyResult::denied("blacklist", "x is blacklisted").to_string(),
                "denied by blacklist: x is blacklisted"
            );
        }
    }
}
