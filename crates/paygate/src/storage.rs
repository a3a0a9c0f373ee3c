//! Account storage.
//!
//! Accounts are addressed by paths of the form `accounts/<name>`. The
//! [`AccountStore`] trait is the boundary the backend and the payment
//! orchestrator consume; two implementations are provided:
//!
//! - [`MemoryAccountStore`] keeps records in a map (tests, `serve --ephemeral`)
//! - [`FileAccountStore`] keeps one JSON document per account on disk
//!
//! # Security
//!
//! - The storage directory is created with 0700 permissions
//! - Record files are written with 0600 permissions
//! - Writes go to a uniquely named temp file that is renamed into place
//! - Creating an account never replaces an existing record
//! - Account names are restricted so a path cannot escape the directory
//! - The WIF is held in a [`Zeroizing`] string and never appears in `Debug` output

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use async_trait::async_trait;
use paygate_core::error::StoreError;
use paygate_core::types::AccountPolicy;
use paygate_crypto::{SecretKey, SecretKeyError};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use zeroize::Zeroizing;

/// Path prefix for account records.
pub const ACCOUNTS_PREFIX: &str = "accounts/";

/// Extension of account record files.
const RECORD_EXTENSION: &str = "json";

/// Suffix of in-flight temp files; never listed as records.
const TEMP_SUFFIX: &str = ".tmp";

// ============================================================================
// Paths
// ============================================================================

/// Build the storage path for an account name.
#[must_use]
pub fn account_path(name: &str) -> String {
    format!("{ACCOUNTS_PREFIX}{name}")
}

/// Extract and validate the account name from an `accounts/<name>` path.
///
/// # Errors
///
/// Returns [`StoreError::InvalidPath`] if the prefix is missing or the name
/// is not a valid account name.
pub fn account_name(path: &str) -> Result<&str, StoreError> {
    let name = path
        .strip_prefix(ACCOUNTS_PREFIX)
        .ok_or_else(|| StoreError::invalid_path(path))?;
    validate_name(name).map_err(|()| StoreError::invalid_path(path))?;
    Ok(name)
}

/// Valid names are non-empty, do not start with a dot and contain only ASCII
/// alphanumerics, `-` and `_`.
fn validate_name(name: &str) -> Result<(), ()> {
    if name.is_empty() || name.starts_with('.') {
        return Err(());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(());
    }
    Ok(())
}

/// Returns `true` if `name` is usable as an account name.
#[must_use]
pub fn is_valid_account_name(name: &str) -> bool {
    validate_name(name).is_ok()
}

// ============================================================================
// AccountRecord
// ============================================================================

/// Persisted form of a custodied account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account name (the last path segment).
    pub name: String,
    /// P2PKH address derived from the key.
    pub address: String,
    /// WIF-encoded private key.
    pub wif: Zeroizing<String>,
    /// Per-transaction spend limit; `"0"` or empty means unbounded.
    #[serde(default)]
    pub tx_spend_limit: String,
    /// Destinations that are always refused.
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// When non-empty, the only allowed destinations.
    #[serde(default)]
    pub whitelist: Vec<String>,
}

/// The parts of an account needed to authorize and sign one payment.
#[derive(Debug)]
pub struct SigningAccount {
    /// The account's P2PKH address.
    pub address: String,
    /// The account's spending policy.
    pub policy: AccountPolicy,
    /// The decoded private key.
    pub key: SecretKey,
}

impl AccountRecord {
    /// The account's spending policy.
    #[must_use]
    pub fn policy(&self) -> AccountPolicy {
        AccountPolicy {
            tx_spend_limit: self.tx_spend_limit.clone(),
            blacklist: self.blacklist.clone(),
            whitelist: self.whitelist.clone(),
        }
    }

    /// Replace the policy fields, leaving key and address untouched.
    pub fn set_policy(&mut self, policy: AccountPolicy) {
        self.tx_spend_limit = policy.tx_spend_limit;
        self.blacklist = policy.blacklist;
        self.whitelist = policy.whitelist;
    }

    /// Consume the record, decoding the WIF into a [`SecretKey`].
    ///
    /// The WIF string is wiped when the record is dropped here.
    ///
    /// # Errors
    ///
    /// Returns [`SecretKeyError::InvalidWif`] if the stored WIF does not decode.
    pub fn into_signing_parts(self) -> Result<SigningAccount, SecretKeyError> {
        let key = SecretKey::from_wif(&self.wif)?;
        let policy = self.policy();
        Ok(SigningAccount {
            address: self.address.clone(),
            policy,
            key,
        })
    }
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("wif", &"[REDACTED]")
            .field("tx_spend_limit", &self.tx_spend_limit)
            .field("blacklist", &self.blacklist)
            .field("whitelist", &self.whitelist)
            .finish()
    }
}

// ============================================================================
// AccountStore
// ============================================================================

/// Storage boundary for account records.
///
/// Implementations must be safe to share across tasks. The caller applies
/// read deadlines and cancellation; implementations only report failures.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load the record at `path`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] for a malformed path, or a storage failure.
    async fn get(&self, path: &str) -> Result<Option<AccountRecord>, StoreError>;

    /// Write `record` at `path`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] for a malformed path, or a storage failure.
    async fn put(&self, path: &str, record: AccountRecord) -> Result<(), StoreError>;

    /// Write `record` at `path` only if no record is stored there.
    ///
    /// The check and the write are a single atomic step: of several
    /// concurrent creates for one path, exactly one succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the path is taken,
    /// [`StoreError::InvalidPath`] for a malformed path, or a storage failure.
    async fn create(&self, path: &str, record: AccountRecord) -> Result<(), StoreError>;

    /// Returns `true` if a record exists at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`AccountStore::get`].
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.get(path).await?.is_some())
    }

    /// Sorted names of all stored accounts.
    ///
    /// # Errors
    ///
    /// Returns a storage failure.
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
impl<S: AccountStore + ?Sized> AccountStore for Arc<S> {
    async fn get(&self, path: &str) -> Result<Option<AccountRecord>, StoreError> {
        (**self).get(path).await
    }

    async fn put(&self, path: &str, record: AccountRecord) -> Result<(), StoreError> {
        (**self).put(path, record).await
    }

    async fn create(&self, path: &str, record: AccountRecord) -> Result<(), StoreError> {
        (**self).create(path, record).await
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        (**self).exists(path).await
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        (**self).list().await
    }
}

// ============================================================================
// MemoryAccountStore
// ============================================================================

/// In-memory account storage.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    records: RwLock<HashMap<String, AccountRecord>>,
}

impl MemoryAccountStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, path: &str) -> Result<Option<AccountRecord>, StoreError> {
        let name = account_name(path)?;
        Ok(self.records.read().await.get(name).cloned())
    }

    async fn put(&self, path: &str, record: AccountRecord) -> Result<(), StoreError> {
        let name = account_name(path)?.to_string();
        self.records.write().await.insert(name, record);
        Ok(())
    }

    async fn create(&self, path: &str, record: AccountRecord) -> Result<(), StoreError> {
        let name = account_name(path)?.to_string();
        match self.records.write().await.entry(name) {
            Entry::Occupied(_) => Err(StoreError::already_exists(path)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.records.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

// ============================================================================
// FileAccountStore
// ============================================================================

/// File-based account storage, one `<name>.json` file per account.
#[derive(Debug, Clone)]
pub struct FileAccountStore {
    dir: PathBuf,
}

impl FileAccountStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if the directory cannot be created, or
    /// [`StoreError::PermissionDenied`] if its permissions cannot be set.
    pub fn with_path(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&dir)?.permissions();
            perms.set_mode(0o700);
            fs::set_permissions(&dir, perms)?;
        }

        Ok(Self { dir })
    }

    /// The storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{RECORD_EXTENSION}"))
    }

    fn read_record(path: &Path) -> Result<Option<AccountRecord>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::invalid_record(e.to_string()))
    }

    /// Write the record to a fresh temp file, then move it into place.
    ///
    /// Each writer gets its own temp file, so concurrent writers never see
    /// each other's partial output. With [`WriteMode::CreateNew`] the final
    /// move fails instead of replacing an existing record.
    fn write_record(
        dir: &Path,
        name: &str,
        record: &AccountRecord,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let bytes = Zeroizing::new(
            serde_json::to_vec_pretty(record)
                .map_err(|e| StoreError::invalid_record(e.to_string()))?,
        );

        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;

        #[cfg(unix)]
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))?;

        let path = dir.join(format!("{name}.{RECORD_EXTENSION}"));
        let persisted = match mode {
            WriteMode::Replace => temp.persist(&path),
            WriteMode::CreateNew => temp.persist_noclobber(&path),
        };

        // A failed persist drops the temp file, which removes it
        match persisted {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::already_exists(account_path(name)))
            }
            Err(e) => Err(e.error.into()),
        }
    }

    fn list_names(dir: &Path) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    if is_valid_account_name(name) {
                        names.push(name.to_string());
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

/// How [`FileAccountStore::write_record`] treats an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Replace,
    CreateNew,
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::io_error(std::io::Error::other(e.to_string())))?
}

#[async_trait]
impl AccountStore for FileAccountStore {
    async fn get(&self, path: &str) -> Result<Option<AccountRecord>, StoreError> {
        let file = self.record_path(account_name(path)?);
        blocking(move || Self::read_record(&file)).await
    }

    async fn put(&self, path: &str, record: AccountRecord) -> Result<(), StoreError> {
        let name = account_name(path)?.to_string();
        let dir = self.dir.clone();
        blocking(move || Self::write_record(&dir, &name, &record, WriteMode::Replace)).await
    }

    async fn create(&self, path: &str, record: AccountRecord) -> Result<(), StoreError> {
        let name = account_name(path)?.to_string();
        let dir = self.dir.clone();
        blocking(move || Self::write_record(&dir, &name, &record, WriteMode::CreateNew)).await
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let file = self.record_path(account_name(path)?);
        blocking(move || Ok(file.try_exists()?)).await
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.dir.clone();
        blocking(move || Self::list_names(&dir)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
