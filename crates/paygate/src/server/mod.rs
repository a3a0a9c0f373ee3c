//! # Server Module
//!
//! JSON-RPC 2.0 over a Unix domain socket.
//!
//! ## Submodules
//!
//! - [`protocol`] - Request, response and error types, method names and params
//! - [`socket`] - The socket server: accept loop, connection handling, dispatch

pub mod protocol;
pub mod socket;

pub use protocol::{
    error_codes, BackendParams, DecodeTransactionParams, GetFeeRateResult, GetStatusResult,
    JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse, Method, ParseMethodError,
};

pub use socket::{PaygateServer, ServerConfig, ServerError};
