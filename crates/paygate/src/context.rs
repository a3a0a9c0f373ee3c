//! Per-request deadline and cancellation.
//!
//! Every backend operation receives a [`RequestContext`]. Storage reads and
//! fee-service calls are the only points that can block, and both go through
//! the context so they honour the read timeout and the cancellation token.

use std::future::Future;
use std::time::Duration;

use paygate_core::error::{PaygateError, StoreError};
use tokio_util::sync::CancellationToken;

/// Default storage read deadline.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Deadline and cancellation state for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    read_timeout: Duration,
    correlation_id: Option<String>,
}

impl RequestContext {
    /// Create a context with the given storage read deadline.
    #[must_use]
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            read_timeout,
            correlation_id: None,
        }
    }

    /// Use `token` for cancellation instead of a fresh one.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Attach a correlation id for log output.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Derive a context that is cancelled along with this one but can also be
    /// cancelled on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            read_timeout: self.read_timeout,
            correlation_id: self.correlation_id.clone(),
        }
    }

    /// Cancel this context and all of its children.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The storage read deadline.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// The correlation id, if one was attached.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Fail fast with [`PaygateError::Cancelled`] if the context is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`PaygateError::Cancelled`] after cancellation.
    pub fn ensure_active(&self) -> Result<(), PaygateError> {
        if self.is_cancelled() {
            Err(PaygateError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run a storage read for `path` under the read deadline and cancellation.
    ///
    /// # Errors
    ///
    /// - [`PaygateError::Cancelled`] if the context is cancelled first
    /// - [`PaygateError::Store`] with [`StoreError::Timeout`] if the deadline passes
    /// - [`PaygateError::Store`] with the read's own error otherwise
    pub async fn read<T, F>(&self, path: &str, read: F) -> Result<T, PaygateError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.ensure_active()?;

        tokio::select! {
            biased;

            () = self.cancel.cancelled() => Err(PaygateError::Cancelled),

            outcome = tokio::time::timeout(self.read_timeout, read) => match outcome {
                Ok(result) => result.map_err(PaygateError::from),
                Err(_) => {
                    tracing::warn!(path, timeout_ms = duration_millis(self.read_timeout), "storage read timed out");
                    Err(PaygateError::Store(StoreError::Timeout {
                        path: path.to_string(),
                        millis: duration_millis(self.read_timeout),
                    }))
                }
            },
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(DEFAULT_READ_TIMEOUT)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
