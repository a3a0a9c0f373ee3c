//! Payment orchestration.
//!
//! [`PaymentOrchestrator::create_payment`] runs one payment through a fixed
//! sequence of steps, stopping at the first failure:
//!
//! ```text
//! validate fields → load source → load destination → evaluate policy
//!   → decode unsigned tx → sign and verify → encode → respond
//! ```
//!
//! Nothing is cached between calls. The source key is decoded just before
//! signing, moved into the blocking signing task and wiped when it ends.

use std::sync::Arc;

use paygate_chain::{codec, SigningEngine};
use paygate_core::error::{PaygateError, SignError};
use paygate_core::network::NetworkParameters;
use paygate_core::types::{PaymentRequest, PolicyResult, SignedPayment};
use paygate_policy::{DefaultPolicyEngine, PolicyEngine};

use crate::context::RequestContext;
use crate::storage::{account_path, is_valid_account_name, AccountRecord, AccountStore};

/// Request field names, as they appear at the request boundary.
pub mod fields {
    /// Paying account name.
    pub const SOURCE: &str = "source";
    /// Receiving account name.
    pub const DESTINATION: &str = "destination";
    /// Hex-encoded unsigned transaction.
    pub const UNSIGNED_TX: &str = "unsignedTx";
    /// Amount in satoshis.
    pub const AMOUNT: &str = "amount";
    /// Comma-separated co-signers; accepted and ignored.
    pub const ADDITIONAL_SIGNERS: &str = "additionalSigners";
}

/// Composes storage, policy, codec and signing into one payment operation.
pub struct PaymentOrchestrator {
    store: Arc<dyn AccountStore>,
    policy: Arc<dyn PolicyEngine>,
    signer: Arc<SigningEngine>,
}

impl PaymentOrchestrator {
    /// Create an orchestrator on `network` with the default policy engine.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, network: NetworkParameters) -> Self {
        Self {
            store,
            policy: Arc::new(DefaultPolicyEngine::new()),
            signer: Arc::new(SigningEngine::new(network)),
        }
    }

    /// Replace the policy engine.
    #[must_use]
    pub fn with_policy_engine(mut self, policy: Arc<dyn PolicyEngine>) -> Self {
        self.policy = policy;
        self
    }

    /// The network payments are signed for.
    #[must_use]
    pub fn network(&self) -> NetworkParameters {
        self.signer.network()
    }

    /// Authorize and sign a payment.
    ///
    /// # Errors
    ///
    /// - [`PaygateError::MissingField`] for an empty `source`, `destination` or `unsignedTx`
    /// - [`PaygateError::InvalidField`] for a malformed account name or a transaction with no inputs
    /// - [`PaygateError::SourceNotFound`] / [`PaygateError::DestinationNotFound`]
    /// - [`PaygateError::PolicyDenied`] carrying the policy reason verbatim
    /// - [`PaygateError::Decode`] if the unsigned transaction does not decode
    /// - [`PaygateError::Sign`] if a key, script or verification step fails
    /// - [`PaygateError::Store`] / [`PaygateError::Cancelled`] from storage reads
    pub async fn create_payment(
        &self,
        ctx: &RequestContext,
        request: PaymentRequest,
    ) -> Result<SignedPayment, PaygateError> {
        // 1. Validate fields
        Self::validate(&request)?;

        if !request.additional_signers.is_empty() {
            tracing::debug!(
                count = request.additional_signers.len(),
                "additional signers are not supported and were ignored"
            );
        }

        // 2. Load source account
        let source = self
            .load(ctx, &request.source)
            .await?
            .ok_or(PaygateError::SourceNotFound)?;

        // 3. Load destination account
        let destination = self
            .load(ctx, &request.destination)
            .await?
            .ok_or(PaygateError::DestinationNotFound)?;

        // 4. Evaluate policy
        let verdict = self
            .policy
            .check(&source.policy(), request.amount, &destination.address);
        if let PolicyResult::Denied { rule, reason } = verdict {
            tracing::info!(
                source = %request.source,
                destination = %destination.address,
                amount = request.amount,
                rule = %rule,
                "payment denied by policy"
            );
            return Err(PaygateError::PolicyDenied { rule, reason });
        }

        // 5. Decode unsigned transaction
        let tx = codec::decode_hex(&request.unsigned_tx)?;
        if tx.input.is_empty() {
            return Err(PaygateError::invalid_field(
                fields::UNSIGNED_TX,
                "transaction has no inputs",
            ));
        }

        // 6. Sign and verify every input
        ctx.ensure_active()?;
        let account = source
            .into_signing_parts()
            .map_err(|e| SignError::invalid_key(e.to_string()))?;
        let source_address = account.address;
        let key = account.key;

        let signer = Arc::clone(&self.signer);
        let address = source_address.clone();
        let amount = request.amount;
        let signed = tokio::task::spawn_blocking(move || signer.sign(key, &address, tx, amount))
            .await
            .map_err(|e| PaygateError::Internal(format!("signing task failed: {e}")))??;

        // 7. Encode
        let payment = SignedPayment {
            source_address,
            transaction_hash: signed.txid(),
            signed_transaction: signed.to_hex(),
        };

        tracing::info!(
            source = %request.source,
            destination = %destination.address,
            amount = request.amount,
            txid = %payment.transaction_hash,
            inputs = signed.report().states().len(),
            "payment signed"
        );

        Ok(payment)
    }

    fn validate(request: &PaymentRequest) -> Result<(), PaygateError> {
        for (field, value) in [
            (fields::SOURCE, &request.source),
            (fields::DESTINATION, &request.destination),
            (fields::UNSIGNED_TX, &request.unsigned_tx),
        ] {
            if value.trim().is_empty() {
                return Err(PaygateError::missing_field(field));
            }
        }

        for (field, name) in [
            (fields::SOURCE, &request.source),
            (fields::DESTINATION, &request.destination),
        ] {
            if !is_valid_account_name(name) {
                return Err(PaygateError::invalid_field(
                    field,
                    format!("'{name}' is not a valid account name"),
                ));
            }
        }

        Ok(())
    }

    async fn load(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Option<AccountRecord>, PaygateError> {
        let path = account_path(name);
        ctx.read(&path, self.store.get(&path)).await
    }
}

impl std::fmt::Debug for PaymentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentOrchestrator")
            .field("network", &self.network())
            .finish_non_exhaustive()
    }
}
