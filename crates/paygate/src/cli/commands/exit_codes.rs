//! Process exit codes shared by every command.

/// Successful operation.
pub const EXIT_SUCCESS: i32 = 0;

/// An account policy denied the payment (limit, blacklist or whitelist).
pub const EXIT_POLICY_DENIED: i32 = 1;

/// Any other failure (configuration, storage, decoding, signing, fee service).
pub const EXIT_ERROR: i32 = 2;
