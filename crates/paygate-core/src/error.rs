//! Error types for the paygate signing service.
//!
//! Errors are organized by the component that produces them:
//!
//! - [`ParseError`] - Unsigned transaction decoding failures
//! - [`SignError`] - Key decoding, script generation and script verification failures
//! - [`StoreError`] - Account storage failures
//! - [`ConfigError`] - Configuration failures
//! - [`FeeError`] - Fee-rate service failures
//! - [`PaygateError`] - Top-level error returned by request handlers
//!
//! Every [`PaygateError`] carries an HTTP-like status code (see
//! [`PaygateError::status_code`]) and a JSON-RPC code (see [`RpcErrorCode`]).
//!
//! # Example
//!
//! ```rust
//! use paygate_core::error::{PaygateError, ParseError};
//!
//! let err: PaygateError = ParseError::malformed_transaction("unexpected end of data").into();
//! assert_eq!(err.status_code(), 400);
//! assert_eq!(
//!     err.to_string(),
//!     "unable to decode unsigned transaction: malformed transaction: unexpected end of data"
//! );
//! ```

use std::fmt;

/// Top-level error type for request handling.
#[derive(Debug, thiserror::Error)]
pub enum PaygateError {
    /// A required request field was absent or empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// A request field was present but could not be interpreted.
    #[error("invalid value for {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The request carried fields the target path does not declare.
    #[error("unknown fields: {fields}")]
    UnknownFields {
        /// Comma-separated list of the undeclared fields.
        fields: String,
    },

    /// The payment source account does not exist.
    #[error("source account not found")]
    SourceNotFound,

    /// The payment destination account does not exist.
    #[error("destination account not found")]
    DestinationNotFound,

    /// A directly addressed account does not exist.
    #[error("account not found: {name}")]
    AccountNotFound {
        /// The account name.
        name: String,
    },

    /// An account with this name already exists.
    #[error("account already exists: {name}")]
    AccountExists {
        /// The account name.
        name: String,
    },

    /// The source account's policy denied the payment.
    ///
    /// The display form is the policy reason, verbatim.
    #[error("{reason}")]
    PolicyDenied {
        /// The policy rule that denied the payment.
        rule: String,
        /// Human-readable reason for denial.
        reason: String,
    },

    /// The unsigned transaction could not be decoded.
    #[error("unable to decode unsigned transaction: {0}")]
    Decode(#[from] ParseError),

    /// Signing or script verification failed.
    #[error("unable to sign transaction: {0}")]
    Sign(#[from] SignError),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The fee-rate collaborator failed.
    #[error("fee estimation failed: {0}")]
    Fee(#[from] FeeError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No handler exists for the requested path.
    #[error("unsupported path: {path}")]
    UnsupportedPath {
        /// The requested path.
        path: String,
    },

    /// The path exists but does not support the requested operation.
    #[error("unsupported operation {operation} on {path}")]
    UnsupportedOperation {
        /// The requested operation.
        operation: String,
        /// The requested path.
        path: String,
    },

    /// The request was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// Unexpected internal failure (e.g. a worker task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

impl PaygateError {
    /// Create a `MissingField` error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an `InvalidField` error.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a `PolicyDenied` error.
    #[must_use]
    pub fn policy_denied(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PolicyDenied {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Create an `AccountNotFound` error.
    #[must_use]
    pub fn account_not_found(name: impl Into<String>) -> Self {
        Self::AccountNotFound { name: name.into() }
    }

    /// Create an `AccountExists` error.
    #[must_use]
    pub fn account_exists(name: impl Into<String>) -> Self {
        Self::AccountExists { name: name.into() }
    }

    /// HTTP-like status code for this error.
    ///
    /// | Status | Errors |
    /// |--------|--------|
    /// | 400 | validation, unknown account, policy denial, decode |
    /// | 404 | unknown path |
    /// | 405 | unsupported operation |
    /// | 500 | signing, storage, fee service, configuration, cancellation, internal |
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingField { .. }
            | Self::InvalidField { .. }
            | Self::UnknownFields { .. }
            | Self::SourceNotFound
            | Self::DestinationNotFound
            | Self::AccountNotFound { .. }
            | Self::AccountExists { .. }
            | Self::PolicyDenied { .. }
            | Self::Decode(_) => 400,
            Self::UnsupportedPath { .. } => 404,
            Self::UnsupportedOperation { .. } => 405,
            Self::Sign(_)
            | Self::Store(_)
            | Self::Fee(_)
            | Self::Config(_)
            | Self::Cancelled
            | Self::Internal(_) => 500,
        }
    }

    /// Returns `true` if this error is a policy denial.
    #[must_use]
    pub const fn is_policy_denied(&self) -> bool {
        matches!(self, Self::PolicyDenied { .. })
    }

    /// Returns the denial reason if this is a policy denial.
    #[must_use]
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            Self::PolicyDenied { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// JSON-RPC 2.0 error codes.
///
/// Standard codes from -32700 to -32600 are reserved by JSON-RPC 2.0.
/// Application-specific codes use the -32000 to -32099 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RpcErrorCode {
    /// Invalid JSON was received by the server.
    ParseFailed = -32700,
    /// The JSON sent is not a valid Request object.
    InvalidRequest = -32600,
    /// The method does not exist or is not available.
    MethodNotFound = -32601,
    /// Invalid method parameter(s).
    InvalidParams = -32602,
    /// Internal JSON-RPC error.
    InternalError = -32603,

    // Application-specific codes (-32000 to -32099)
    /// Policy denied the payment.
    PolicyDenied = -32001,
    /// The unsigned transaction could not be decoded.
    DecodeFailed = -32002,
    /// The requested account was not found.
    AccountNotFound = -32003,
    /// The signing operation failed.
    SignatureFailed = -32004,
    /// The fee-rate service could not be reached or gave no estimate.
    FeeUnavailable = -32005,
}

impl RpcErrorCode {
    /// Get the numeric error code value.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Get a human-readable message for this error code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseFailed => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::PolicyDenied => "Policy denied",
            Self::DecodeFailed => "Decode failed",
            Self::AccountNotFound => "Account not found",
            Self::SignatureFailed => "Signature failed",
            Self::FeeUnavailable => "Fee unavailable",
        }
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

impl From<&PaygateError> for RpcErrorCode {
    fn from(error: &PaygateError) -> Self {
        match error {
            PaygateError::MissingField { .. }
            | PaygateError::InvalidField { .. }
            | PaygateError::UnknownFields { .. }
            | PaygateError::AccountExists { .. } => Self::InvalidParams,
            PaygateError::SourceNotFound
            | PaygateError::DestinationNotFound
            | PaygateError::AccountNotFound { .. } => Self::AccountNotFound,
            PaygateError::PolicyDenied { .. } => Self::PolicyDenied,
            PaygateError::Decode(_) => Self::DecodeFailed,
            PaygateError::Sign(_) => Self::SignatureFailed,
            PaygateError::Fee(_) => Self::FeeUnavailable,
            PaygateError::UnsupportedPath { .. } | PaygateError::UnsupportedOperation { .. } => {
                Self::MethodNotFound
            }
            PaygateError::Store(_)
            | PaygateError::Config(_)
            | PaygateError::Cancelled
            | PaygateError::Internal(_) => Self::InternalError,
        }
    }
}

impl From<PaygateError> for RpcErrorCode {
    fn from(error: PaygateError) -> Self {
        Self::from(&error)
    }
}

// ============================================================================
// ParseError
// ============================================================================

/// Errors that can occur while decoding an unsigned transaction.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input was not valid hexadecimal.
    #[error("invalid hex: {context}")]
    InvalidHex {
        /// Details from the hex decoder.
        context: String,
    },

    /// The bytes do not form a complete, well-formed transaction.
    #[error("malformed transaction: {context}")]
    MalformedTransaction {
        /// Details from the consensus decoder.
        context: String,
    },
}

impl ParseError {
    /// Create an `InvalidHex` error.
    #[must_use]
    pub fn invalid_hex(context: impl Into<String>) -> Self {
        Self::InvalidHex {
            context: context.into(),
        }
    }

    /// Create a `MalformedTransaction` error.
    #[must_use]
    pub fn malformed_transaction(context: impl Into<String>) -> Self {
        Self::MalformedTransaction {
            context: context.into(),
        }
    }
}

// ============================================================================
// SignError
// ============================================================================

/// Errors that can occur while signing a transaction.
///
/// Per-input failures carry the index of the input that failed.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The stored key material could not be decoded.
    #[error("invalid signing key: {context}")]
    InvalidKey {
        /// Why the key was rejected (never contains key material).
        context: String,
    },

    /// The source address could not be parsed for the configured network.
    #[error("invalid source address {address}: {context}")]
    InvalidAddress {
        /// The address as stored on the account.
        address: String,
        /// Details from the address parser.
        context: String,
    },

    /// The signature script for an input could not be produced.
    #[error("could not generate signature script for input {input}: {context}")]
    ScriptGeneration {
        /// Index of the failing input.
        input: usize,
        /// Details of the failure.
        context: String,
    },

    /// The freshly signed input did not pass script verification.
    #[error("script verification failed for input {input}: {context}")]
    VerificationFailed {
        /// Index of the failing input.
        input: usize,
        /// Why script verification rejected the input.
        context: String,
    },
}

impl SignError {
    /// Create an `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(context: impl Into<String>) -> Self {
        Self::InvalidKey {
            context: context.into(),
        }
    }

    /// Create an `InvalidAddress` error.
    #[must_use]
    pub fn invalid_address(address: impl Into<String>, context: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            context: context.into(),
        }
    }

    /// Create a `ScriptGeneration` error.
    #[must_use]
    pub fn script_generation(input: usize, context: impl Into<String>) -> Self {
        Self::ScriptGeneration {
            input,
            context: context.into(),
        }
    }

    /// Create a `VerificationFailed` error.
    #[must_use]
    pub fn verification_failed(input: usize, context: impl Into<String>) -> Self {
        Self::VerificationFailed {
            input,
            context: context.into(),
        }
    }

    /// Index of the input that failed, if the failure is input-specific.
    #[must_use]
    pub const fn input_index(&self) -> Option<usize> {
        match self {
            Self::ScriptGeneration { input, .. } | Self::VerificationFailed { input, .. } => {
                Some(*input)
            }
            Self::InvalidKey { .. } | Self::InvalidAddress { .. } => None,
        }
    }
}

// ============================================================================
// StoreError
// ============================================================================

/// Errors that can occur in the account storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// File system I/O error.
    #[error("I/O error: {0}")]
    IoError(#[source] std::io::Error),

    /// A stored record could not be serialized or deserialized.
    #[error("invalid account record: {context}")]
    InvalidRecord {
        /// Details from the serializer.
        context: String,
    },

    /// The storage path is not of the form `accounts/<name>`, or the name is invalid.
    #[error("invalid account path: {path}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// A record was created at a path that already holds one.
    #[error("record already exists: {path}")]
    AlreadyExists {
        /// The occupied path.
        path: String,
    },

    /// A storage read did not complete within its deadline.
    #[error("timed out reading {path} after {millis}ms")]
    Timeout {
        /// The path being read.
        path: String,
        /// The deadline in milliseconds.
        millis: u64,
    },

    /// Insufficient file system permissions.
    #[error("permission denied")]
    PermissionDenied,
}

impl StoreError {
    /// Create an `IoError` from a `std::io::Error`.
    #[must_use]
    pub const fn io_error(error: std::io::Error) -> Self {
        Self::IoError(error)
    }

    /// Create an `InvalidRecord` error.
    #[must_use]
    pub fn invalid_record(context: impl Into<String>) -> Self {
        Self::InvalidRecord {
            context: context.into(),
        }
    }

    /// Create an `InvalidPath` error.
    #[must_use]
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// Create an `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::IoError(error),
        }
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {context}")]
    ParseFailed {
        /// Context about the parsing failure.
        context: String,
    },

    /// A configuration value is invalid.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field name with the invalid value.
        field: String,
        /// The invalid value.
        value: String,
    },

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDirectory,

    /// I/O error while reading or writing configuration.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a `FileNotFound` error.
    #[must_use]
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a `ParseFailed` error.
    #[must_use]
    pub fn parse_failed(context: impl Into<String>) -> Self {
        Self::ParseFailed {
            context: context.into(),
        }
    }

    /// Create an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a `NoHomeDirectory` error.
    #[must_use]
    pub const fn no_home_directory() -> Self {
        Self::NoHomeDirectory
    }

    /// Create an `Io` error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

// ============================================================================
// FeeError
// ============================================================================

/// Errors raised by the fee-rate client.
#[derive(Debug, thiserror::Error)]
pub enum FeeError {
    /// Could not open a connection to the fee service.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// `host:port` of the fee service.
        endpoint: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TLS setup or handshake failed.
    #[error("TLS error with {endpoint}: {context}")]
    Tls {
        /// `host:port` of the fee service.
        endpoint: String,
        /// Details of the failure.
        context: String,
    },

    /// Reading or writing the connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The service replied with something that is not a fee response.
    #[error("invalid fee response: {context}")]
    Protocol {
        /// Details of the failure.
        context: String,
    },

    /// A single attempt exceeded its deadline.
    #[error("fee request to {endpoint} timed out")]
    Timeout {
        /// `host:port` of the fee service.
        endpoint: String,
    },

    /// No positive estimate was obtained within the attempt budget.
    #[error("could not get fees after {attempts} attempts")]
    Unavailable {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The caller cancelled the request.
    #[error("fee request cancelled")]
    Cancelled,
}

impl FeeError {
    /// Create a `Protocol` error.
    #[must_use]
    pub fn protocol(context: impl Into<String>) -> Self {
        Self::Protocol {
            context: context.into(),
        }
    }
}

// ============================================================================
// Result type aliases
// ============================================================================

/// A `Result` type alias using [`PaygateError`] as the error type.
pub type Result<T> = std::result::Result<T, PaygateError>;

/// A `Result` type alias for decoding operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// A `Result` type alias for signing operations.
pub type SignResult<T> = std::result::Result<T, SignError>;

/// A `Result` type alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A `Result` type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Unit Tests
// ============================================================================
