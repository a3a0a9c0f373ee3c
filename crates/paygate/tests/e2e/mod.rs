//! End-to-end integration tests.

pub mod fee_test;
pub mod payment_flow_test;
pub mod policy_test;
pub mod server_test;
