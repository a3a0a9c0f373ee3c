//! # JSON-RPC 2.0 Protocol Types
//!
//! Request/response types for the line-delimited JSON-RPC 2.0 protocol
//! spoken over the paygate Unix socket.
//!
//! ## Methods
//!
//! | Method              | Params                 | Result                        |
//! |---------------------|------------------------|-------------------------------|
//! | `create`            | `{path, data}`         | backend response data         |
//! | `read`              | `{path, data?}`        | backend response data         |
//! | `update`            | `{path, data}`         | backend response data         |
//! | `decodeTransaction` | `{tx}`                 | transaction summary           |
//! | `getFeeRate`        | none                   | `{fee, fee_rate}`             |
//! | `getStatus`         | none                   | `{initialized, version, ...}` |
//!
//! ## Example
//!
//! ```rust
//! use paygate::server::protocol::{JsonRpcId, JsonRpcRequest};
//!
//! let request = JsonRpcRequest {
//!     jsonrpc: "2.0".to_string(),
//!     method: "read".to_string(),
//!     params: serde_json::json!({"path": "accounts/alice"}),
//!     id: JsonRpcId::Number(1),
//! };
//!
//! assert!(request.validate().is_ok());
//! ```

use std::collections::BTreeMap;

use paygate_core::error::{PaygateError, RpcErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::{Operation, Request};

/// Standard JSON-RPC 2.0 error codes and paygate-specific error codes.
pub mod error_codes {
    use paygate_core::error::RpcErrorCode;

    /// Parse error - Invalid JSON was received by the server.
    pub const PARSE_ERROR: i32 = RpcErrorCode::ParseFailed.code();

    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = RpcErrorCode::InvalidRequest.code();

    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = RpcErrorCode::MethodNotFound.code();

    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = RpcErrorCode::InvalidParams.code();

    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = RpcErrorCode::InternalError.code();

    // Custom paygate errors (-32000 to -32099)

    /// Policy denied - An account policy rejected the payment.
    pub const POLICY_DENIED: i32 = RpcErrorCode::PolicyDenied.code();

    /// Decode failed - The unsigned transaction could not be decoded.
    pub const DECODE_FAILED: i32 = RpcErrorCode::DecodeFailed.code();

    /// Account not found - A source, destination or named account is missing.
    pub const ACCOUNT_NOT_FOUND: i32 = RpcErrorCode::AccountNotFound.code();

    /// Signature failed - Signing or script verification failed.
    pub const SIGNATURE_FAILED: i32 = RpcErrorCode::SignatureFailed.code();

    /// Fee unavailable - The fee-rate service gave no usable estimate.
    pub const FEE_UNAVAILABLE: i32 = RpcErrorCode::FeeUnavailable.code();
}

/// JSON-RPC ID type.
///
/// Per JSON-RPC 2.0, an ID can be a string, number, or null.
/// The server replies with the same ID that the client provided.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// Numeric identifier
    Number(i64),
    /// String identifier
    String(String),
    /// Null identifier
    #[default]
    Null,
}

/// JSON-RPC 2.0 request object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version (must be "2.0")
    pub jsonrpc: String,

    /// The name of the method to be invoked
    pub method: String,

    /// Parameters for the method (defaults to null)
    #[serde(default)]
    pub params: Value,

    /// Request identifier for correlating requests and responses
    pub id: JsonRpcId,
}

impl JsonRpcRequest {
    /// Validates that this request conforms to JSON-RPC 2.0.
    ///
    /// # Errors
    ///
    /// Returns a `JsonRpcError` if:
    /// - The `jsonrpc` field is not "2.0"
    /// - The `method` field is empty
    pub fn validate(&self) -> Result<(), JsonRpcError> {
        if self.jsonrpc != "2.0" {
            return Err(JsonRpcError::invalid_request(
                "jsonrpc version must be \"2.0\"",
            ));
        }

        if self.method.is_empty() {
            return Err(JsonRpcError::invalid_request("method cannot be empty"));
        }

        Ok(())
    }
}

/// JSON-RPC 2.0 response object.
///
/// Carries either a `result` or an `error`, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version (always "2.0")
    pub jsonrpc: String,

    /// The result of the method invocation (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error information (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,

    /// Request identifier (matches the request's id)
    pub id: JsonRpcId,
}

impl JsonRpcResponse {
    /// Creates a successful response with the given result.
    ///
    /// # Example
    ///
    /// ```rust
    /// use paygate::server::protocol::{JsonRpcId, JsonRpcResponse};
    ///
    /// let response = JsonRpcResponse::success(
    ///     JsonRpcId::Number(1),
    ///     serde_json::json!({"address": "mkHS9ne12qx9pS9VojpwU5xtRd4T7X7ZUt"}),
    /// );
    /// assert!(response.result.is_some());
    /// assert!(response.error.is_none());
    /// ```
    pub fn success(id: JsonRpcId, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: "2.0".to_string(),
                result: Some(value),
                error: None,
                id,
            },
            Err(e) => Self::error(
                id,
                JsonRpcError::internal_error(&format!("failed to serialize result: {e}")),
            ),
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn error(id: JsonRpcId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    /// Error code indicating the type of error
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Additional error data. Backend failures carry `{"status": <code>}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Invalid JSON was received by the server.
    #[must_use]
    pub fn parse_error(message: &str) -> Self {
        Self {
            code: error_codes::PARSE_ERROR,
            message: format!("Parse error: {message}"),
            data: None,
        }
    }

    /// The JSON sent is not a valid Request object.
    #[must_use]
    pub fn invalid_request(message: &str) -> Self {
        Self {
            code: error_codes::INVALID_REQUEST,
            message: format!("Invalid request: {message}"),
            data: None,
        }
    }

    /// The requested method does not exist.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: error_codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    /// The method parameters are invalid.
    #[must_use]
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: error_codes::INVALID_PARAMS,
            message: format!("Invalid params: {message}"),
            data: None,
        }
    }

    /// Internal server failure.
    #[must_use]
    pub fn internal_error(message: &str) -> Self {
        Self {
            code: error_codes::INTERNAL_ERROR,
            message: format!("Internal error: {message}"),
            data: None,
        }
    }

    /// The status code carried in `data.status`, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.data
            .as_ref()
            .and_then(|data| data.get("status"))
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
    }
}

impl From<&PaygateError> for JsonRpcError {
    /// Map a backend failure. The message is the error's display text and
    /// `data.status` is its status code.
    fn from(error: &PaygateError) -> Self {
        Self {
            code: RpcErrorCode::from(error).code(),
            message: error.to_string(),
            data: Some(serde_json::json!({ "status": error.status_code() })),
        }
    }
}

/// Available JSON-RPC methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Backend create operation
    Create,
    /// Backend read operation
    Read,
    /// Backend update operation
    Update,
    /// Summarize a raw transaction
    DecodeTransaction,
    /// Query the fee-rate service
    GetFeeRate,
    /// Service status
    GetStatus,
}

/// Error returned when parsing an unknown method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown method: {method}")]
pub struct ParseMethodError {
    /// The unknown method name that failed to parse.
    pub method: String,
}

impl std::str::FromStr for Method {
    type Err = ParseMethodError;

    /// Parses a method name.
    ///
    /// # Example
    ///
    /// ```rust
    /// use paygate::server::protocol::Method;
    ///
    /// assert_eq!("create".parse(), Ok(Method::Create));
    /// assert_eq!("getFeeRate".parse(), Ok(Method::GetFeeRate));
    /// assert_eq!("get_status".parse(), Ok(Method::GetStatus));
    /// assert!("sign".parse::<Method>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "decodeTransaction" | "decode_transaction" => Ok(Self::DecodeTransaction),
            "getFeeRate" | "get_fee_rate" => Ok(Self::GetFeeRate),
            "getStatus" | "get_status" => Ok(Self::GetStatus),
            _ => Err(ParseMethodError {
                method: s.to_string(),
            }),
        }
    }
}

impl Method {
    /// Returns the canonical method name string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::DecodeTransaction => "decodeTransaction",
            Self::GetFeeRate => "getFeeRate",
            Self::GetStatus => "getStatus",
        }
    }

    /// The backend operation for `create`, `read` and `update`.
    #[must_use]
    pub const fn operation(self) -> Option<Operation> {
        match self {
            Self::Create => Some(Operation::Create),
            Self::Read => Some(Operation::Read),
            Self::Update => Some(Operation::Update),
            Self::DecodeTransaction | Self::GetFeeRate | Self::GetStatus => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters for `create`, `read` and `update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendParams {
    /// Target path, e.g. `accounts/alice` or `payments`.
    pub path: String,

    /// Request fields. Values may be strings, numbers, booleans or arrays;
    /// arrays are joined with commas.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl BackendParams {
    /// Convert into a backend [`Request`].
    ///
    /// # Errors
    ///
    /// Returns an invalid-params error for a field holding an object.
    pub fn into_request(self, operation: Operation) -> Result<Request, JsonRpcError> {
        let mut data = BTreeMap::new();
        for (name, value) in self.data {
            let text = field_text(&name, &value)?;
            data.insert(name, text);
        }

        Ok(Request {
            operation,
            path: self.path,
            data,
        })
    }
}

fn field_text(name: &str, value: &Value) -> Result<String, JsonRpcError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) | Value::Object(_) => Err(JsonRpcError::invalid_params(
                        &format!("field {name} must be a flat list"),
                    )),
                    other => field_text(name, other),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(parts.join(","))
        }
        Value::Object(_) => Err(JsonRpcError::invalid_params(&format!(
            "field {name} must be a string, number or list"
        ))),
    }
}

/// Parameters for `decodeTransaction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeTransactionParams {
    /// Hex encoded transaction, optional `0x` prefix.
    pub tx: String,
}

/// Result of `getFeeRate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFeeRateResult {
    /// Estimated fee in BTC per kB, after clamping.
    pub fee: f64,

    /// The same estimate in satoshis per byte.
    pub fee_rate: u64,
}

/// Result of `getStatus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStatusResult {
    /// Whether the service is ready to accept requests
    pub initialized: bool,

    /// Service version
    pub version: String,

    /// Configured network name
    pub network: String,

    /// Fee-rate service `host:port`
    pub fee_endpoint: String,
}
