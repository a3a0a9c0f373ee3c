//! Request routing.
//!
//! A [`Request`] names an [`Operation`], a path and a flat map of string
//! fields. [`Backend::handle`] validates the fields against the path's
//! schema and dispatches:
//!
//! | Path              | Create           | Read         | Update          |
//! |-------------------|------------------|--------------|-----------------|
//! | `accounts/<name>` | new key + policy | address, policy | policy fields |
//! | `payments`        | sign payment     | -            | sign payment    |
//!
//! Fields a path does not declare are rejected before anything else runs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use paygate_core::error::{PaygateError, SignError, StoreError};
use paygate_core::network::NetworkParameters;
use paygate_core::types::{parse_address_list, PaymentRequest, SignedPayment};
use paygate_crypto::Secp256k1KeyPair;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::context::RequestContext;
use crate::payments::{fields, PaymentOrchestrator};
use crate::storage::{account_name, account_path, AccountRecord, AccountStore, ACCOUNTS_PREFIX};

/// Path of the payment endpoint.
pub const PAYMENTS_PATH: &str = "payments";

/// Account field: per-transaction spend limit.
pub const TX_SPEND_LIMIT: &str = "tx_spend_limit";
/// Account field: comma-separated blacklist.
pub const BLACKLIST: &str = "blacklist";
/// Account field: comma-separated whitelist.
pub const WHITELIST: &str = "whitelist";

const ACCOUNT_FIELDS: &[&str] = &[TX_SPEND_LIMIT, BLACKLIST, WHITELIST];

const PAYMENT_FIELDS: &[&str] = &[
    fields::SOURCE,
    fields::DESTINATION,
    fields::UNSIGNED_TX,
    fields::AMOUNT,
    fields::ADDITIONAL_SIGNERS,
];

// ============================================================================
// Request / Response
// ============================================================================

/// Kind of operation requested on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create a resource.
    Create,
    /// Read a resource.
    Read,
    /// Update a resource.
    Update,
}

impl Operation {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = PaygateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            other => Err(PaygateError::invalid_field(
                "operation",
                format!("unknown operation '{other}'"),
            )),
        }
    }
}

/// A routed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// What to do.
    pub operation: Operation,
    /// Target path, e.g. `accounts/alice` or `payments`.
    pub path: String,
    /// Named string fields.
    pub data: BTreeMap<String, String>,
}

impl Request {
    /// Create a request with no fields.
    #[must_use]
    pub fn new(operation: Operation, path: impl Into<String>) -> Self {
        Self {
            operation,
            path: path.into(),
            data: BTreeMap::new(),
        }
    }

    /// Add a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.data.get(name).map(String::as_str)
    }

    fn required(&self, name: &str) -> Result<&str, PaygateError> {
        match self.field(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(PaygateError::missing_field(name)),
        }
    }

    fn check_fields(&self, allowed: &[&str]) -> Result<(), PaygateError> {
        let unknown: Vec<&str> = self
            .data
            .keys()
            .map(String::as_str)
            .filter(|k| !allowed.contains(k))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(PaygateError::UnknownFields {
                fields: unknown.join(", "),
            })
        }
    }
}

/// Response data returned on success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response {
    /// Response fields.
    pub data: Map<String, Value>,
}

impl Response {
    /// Look up a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Look up a string field.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

impl From<SignedPayment> for Response {
    fn from(payment: SignedPayment) -> Self {
        let mut data = Map::new();
        data.insert("source_address".into(), payment.source_address.into());
        data.insert("transaction_hash".into(), payment.transaction_hash.into());
        data.insert(
            "signed_transaction".into(),
            payment.signed_transaction.into(),
        );
        Self { data }
    }
}

fn account_view(record: &AccountRecord) -> Response {
    let value = json!({
        "address": record.address,
        "txSpendLimit": record.tx_spend_limit,
        "blacklist": record.blacklist,
        "whitelist": record.whitelist,
    });
    match value {
        Value::Object(data) => Response { data },
        _ => Response::default(),
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Routes requests to account management and payment signing.
pub struct Backend {
    store: Arc<dyn AccountStore>,
    payments: PaymentOrchestrator,
    network: NetworkParameters,
}

impl Backend {
    /// Create a backend over `store` for `network`.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, network: NetworkParameters) -> Self {
        Self {
            payments: PaymentOrchestrator::new(Arc::clone(&store), network),
            store,
            network,
        }
    }

    /// The configured network.
    #[must_use]
    pub const fn network(&self) -> NetworkParameters {
        self.network
    }

    /// The account store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Handle one request.
    ///
    /// # Errors
    ///
    /// Returns a [`PaygateError`]; its [`status_code`](PaygateError::status_code)
    /// is the response status.
    pub async fn handle(
        &self,
        ctx: &RequestContext,
        request: Request,
    ) -> Result<Response, PaygateError> {
        tracing::debug!(
            operation = %request.operation,
            path = %request.path,
            "handling request"
        );

        if request.path == PAYMENTS_PATH {
            return self.handle_payment(ctx, &request).await;
        }

        if let Some(name) = request.path.strip_prefix(ACCOUNTS_PREFIX) {
            account_name(&request.path).map_err(|_| {
                PaygateError::invalid_field("name", format!("'{name}' is not a valid account name"))
            })?;
            return match request.operation {
                Operation::Create => self.create_account(ctx, &request, name).await,
                Operation::Read => self.read_account(ctx, &request, name).await,
                Operation::Update => self.update_account(ctx, &request, name).await,
            };
        }

        Err(PaygateError::UnsupportedPath { path: request.path })
    }

    async fn handle_payment(
        &self,
        ctx: &RequestContext,
        request: &Request,
    ) -> Result<Response, PaygateError> {
        if request.operation == Operation::Read {
            return Err(PaygateError::UnsupportedOperation {
                operation: request.operation.to_string(),
                path: request.path.clone(),
            });
        }

        request.check_fields(PAYMENT_FIELDS)?;
        let payment = payment_request(request)?;
        self.payments
            .create_payment(ctx, payment)
            .await
            .map(Response::from)
    }

    async fn create_account(
        &self,
        ctx: &RequestContext,
        request: &Request,
        name: &str,
    ) -> Result<Response, PaygateError> {
        request.check_fields(ACCOUNT_FIELDS)?;
        let path = account_path(name);

        let keypair = Secp256k1KeyPair::generate();
        let address = keypair.p2pkh_address(self.network).to_string();
        let wif = keypair
            .secret_key()
            .to_wif(self.network)
            .map_err(|e| SignError::invalid_key(e.to_string()))?;

        let mut record = AccountRecord {
            name: name.to_string(),
            address: address.clone(),
            wif,
            tx_spend_limit: "0".to_string(),
            blacklist: Vec::new(),
            whitelist: Vec::new(),
        };
        apply_policy_fields(&mut record, request)?;

        ctx.ensure_active()?;
        match self.store.create(&path, record).await {
            Err(StoreError::AlreadyExists { .. }) => {
                return Err(PaygateError::account_exists(name));
            }
            result => result?,
        }

        tracing::info!(account = name, address = %address, "account created");

        let mut data = Map::new();
        data.insert("address".into(), address.into());
        Ok(Response { data })
    }

    async fn read_account(
        &self,
        ctx: &RequestContext,
        request: &Request,
        name: &str,
    ) -> Result<Response, PaygateError> {
        request.check_fields(&[])?;
        let record = self.load(ctx, name).await?;
        Ok(account_view(&record))
    }

    async fn update_account(
        &self,
        ctx: &RequestContext,
        request: &Request,
        name: &str,
    ) -> Result<Response, PaygateError> {
        request.check_fields(ACCOUNT_FIELDS)?;
        let mut record = self.load(ctx, name).await?;
        apply_policy_fields(&mut record, request)?;

        ctx.ensure_active()?;
        let view = account_view(&record);
        self.store.put(&account_path(name), record).await?;

        tracing::info!(account = name, "account policy updated");
        Ok(view)
    }

    async fn load(&self, ctx: &RequestContext, name: &str) -> Result<AccountRecord, PaygateError> {
        let path = account_path(name);
        ctx.read(&path, self.store.get(&path))
            .await?
            .ok_or_else(|| PaygateError::account_not_found(name))
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

/// Build a [`PaymentRequest`], checking required fields in order.
fn payment_request(request: &Request) -> Result<PaymentRequest, PaygateError> {
    let source = request.required(fields::SOURCE)?;
    let destination = request.required(fields::DESTINATION)?;
    let unsigned_tx = request.required(fields::UNSIGNED_TX)?;
    let amount = request.required(fields::AMOUNT)?;

    let amount = amount.trim().parse::<u64>().map_err(|_| {
        PaygateError::invalid_field(fields::AMOUNT, "must be a non-negative integer")
    })?;

    let additional_signers = request
        .field(fields::ADDITIONAL_SIGNERS)
        .map(parse_address_list)
        .unwrap_or_default();

    Ok(PaymentRequest {
        source: source.to_string(),
        destination: destination.to_string(),
        unsigned_tx: unsigned_tx.to_string(),
        amount,
        additional_signers,
    })
}

/// Overwrite the policy fields present in `request`.
fn apply_policy_fields(record: &mut AccountRecord, request: &Request) -> Result<(), PaygateError> {
    if let Some(limit) = request.field(TX_SPEND_LIMIT) {
        let limit = limit.trim();
        if !limit.is_empty() && limit.parse::<u64>().is_err() {
            return Err(PaygateError::invalid_field(
                TX_SPEND_LIMIT,
                "must be a non-negative integer",
            ));
        }
        record.tx_spend_limit = limit.to_string();
    }
    if let Some(list) = request.field(BLACKLIST) {
        record.blacklist = parse_address_list(list);
    }
    if let Some(list) = request.field(WHITELIST) {
        record.whitelist = parse_address_list(list);
    }
    Ok(())
}
