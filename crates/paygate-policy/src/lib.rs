//! # paygate-policy
//!
//! Per-account spending policy evaluation for the paygate signing service.
//!
//! Each managed account carries an [`AccountPolicy`](paygate_core::types::AccountPolicy):
//! a per-transaction spend limit, a blacklist and a whitelist of destination
//! addresses. The [`engine`] module evaluates a proposed payment against it.
//!
//! ## Modules
//!
//! - [`engine`] - [`PolicyEngine`] trait and the [`DefaultPolicyEngine`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod engine;

pub use engine::{DefaultPolicyEngine, PolicyCheckResult, PolicyEngine};
