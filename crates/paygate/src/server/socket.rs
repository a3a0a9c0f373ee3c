//! Unix socket server for the paygate service.
//!
//! Accepts line-delimited JSON-RPC 2.0 requests and dispatches them to the
//! [`Backend`], the transaction codec and the fee-rate client.
//!
//! # Features
//!
//! - Line-delimited JSON-RPC 2.0 protocol
//! - Configurable socket permissions
//! - Graceful shutdown that cancels in-flight requests
//! - Bounded concurrent connections and request size
//! - Per-request correlation id span
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use paygate::backend::Backend;
//! use paygate::fee::FeeClient;
//! use paygate::server::socket::{PaygateServer, ServerConfig};
//! use paygate::storage::MemoryAccountStore;
//! use paygate_core::network::{NetworkParameters, RemoteEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Backend::new(Arc::new(MemoryAccountStore::new()), NetworkParameters::testnet());
//!     let fee = FeeClient::new(RemoteEndpoint::new("testnet.hsmiths.com", 53012))?;
//!
//!     let server = PaygateServer::new(ServerConfig::default(), backend, fee);
//!
//!     let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
//!     // In another task: shutdown_tx.send(()).unwrap();
//!     server.run(shutdown_rx).await?;
//!     # drop(shutdown_tx);
//!
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use paygate_chain::{codec, TransactionSummary};
use paygate_core::config::Config;
use paygate_core::config_loader::expand_path;
use paygate_core::error::{ConfigError, PaygateError};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::protocol::{
    BackendParams, DecodeTransactionParams, GetFeeRateResult, GetStatusResult, JsonRpcError,
    JsonRpcId, JsonRpcRequest, JsonRpcResponse, Method,
};
use crate::backend::Backend;
use crate::context::{RequestContext, DEFAULT_READ_TIMEOUT};
use crate::fee::{fee_to_rate, FeeClient};
use crate::logging::new_correlation_id;

/// Maximum size of a single JSON-RPC request line (1 MiB).
const MAX_REQUEST_SIZE: u64 = 1024 * 1024;

/// Maximum number of concurrent client connections.
const MAX_CONNECTIONS: usize = 64;

/// Backoff duration after an accept error.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

const TOO_LARGE_RESPONSE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid request: request too large"},"id":null}"#;

/// Socket server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the Unix socket file.
    pub socket_path: PathBuf,

    /// Unix file permissions for the socket (default: 0o600).
    pub socket_permissions: u32,

    /// Lifetime of a client connection before the server closes it.
    pub connection_timeout: Duration,

    /// Storage read deadline applied to every request.
    pub read_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/paygate.sock"),
            socket_permissions: 0o600,
            connection_timeout: Duration::from_secs(30),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Build from the `[server]` and `[storage]` configuration sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the socket path cannot be expanded.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            socket_path: expand_path(&config.server.socket_path)?,
            socket_permissions: config.server.socket_permissions,
            connection_timeout: config.server.timeout(),
            read_timeout: config.storage.read_timeout(),
        })
    }
}

/// Errors that can occur during server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the socket.
    #[error("failed to bind socket at {path}: {source}")]
    Bind {
        /// The socket path that failed to bind.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to set socket permissions.
    #[error("failed to set socket permissions on {path}: {source}")]
    Permissions {
        /// The socket path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Error reading from the socket.
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),

    /// Error writing to the socket.
    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
}

/// Removes the socket file when dropped.
struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Failed to remove socket file"
                );
            }
        }
    }
}

/// Unix socket payment server.
///
/// Connections are served concurrently; the backend, the fee client and the
/// shutdown token are shared between them.
pub struct PaygateServer {
    config: ServerConfig,
    backend: Arc<Backend>,
    fee: Arc<FeeClient>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for PaygateServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaygateServer")
            .field("config", &self.config)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl PaygateServer {
    /// Create a server.
    #[must_use]
    pub fn new(config: ServerConfig, backend: Backend, fee: FeeClient) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            fee: Arc::new(fee),
            shutdown: CancellationToken::new(),
        }
    }

    /// The server settings.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server until a shutdown signal is received.
    ///
    /// 1. Removes any existing socket file
    /// 2. Binds to the Unix socket and sets its permissions
    /// 3. Accepts connections until shutdown
    /// 4. Cancels in-flight requests and removes the socket file
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the socket cannot be bound or its
    /// permissions cannot be set.
    pub async fn run(self, shutdown: oneshot::Receiver<()>) -> Result<(), ServerError> {
        let socket_path = self.config.socket_path.clone();

        if socket_path.exists() {
            std::fs::remove_file(&socket_path).map_err(|e| ServerError::Bind {
                path: socket_path.clone(),
                source: e,
            })?;
        }

        let listener = UnixListener::bind(&socket_path).map_err(|e| ServerError::Bind {
            path: socket_path.clone(),
            source: e,
        })?;
        let _guard = SocketGuard {
            path: socket_path.clone(),
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(self.config.socket_permissions);
            std::fs::set_permissions(&socket_path, permissions).map_err(|e| {
                ServerError::Permissions {
                    path: socket_path.clone(),
                    source: e,
                }
            })?;
        }

        tracing::info!(
            socket_path = %socket_path.display(),
            permissions = format!("{:#o}", self.config.socket_permissions),
            network = self.backend.network().name(),
            "Server started"
        );

        let server = Arc::new(self);
        let connection_semaphore = Arc::new(Semaphore::new(MAX_CONNECTIONS));

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            let Ok(permit) = connection_semaphore.clone().try_acquire_owned() else {
                                tracing::warn!("Connection limit reached ({MAX_CONNECTIONS}), rejecting");
                                drop(stream);
                                continue;
                            };
                            let server_clone = Arc::clone(&server);
                            tokio::spawn(async move {
                                let timeout = server_clone.config.connection_timeout;
                                let result = tokio::time::timeout(
                                    timeout,
                                    Arc::clone(&server_clone).handle_connection(stream),
                                ).await;
                                match result {
                                    Ok(Err(e)) => tracing::warn!(error = %e, "Connection error"),
                                    Err(_) => tracing::debug!("Connection timed out"),
                                    Ok(Ok(())) => {}
                                }
                                drop(permit);
                            });
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept error");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        server.shutdown.cancel();
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Serve one client: one JSON-RPC request per line, one response per line.
    async fn handle_connection(self: Arc<Self>, stream: UnixStream) -> Result<(), ServerError> {
        let (reader, mut writer) = stream.into_split();
        // One byte past the cap so an oversized line is detectable.
        let mut reader = BufReader::new(reader.take(MAX_REQUEST_SIZE + 1));
        let mut line = String::new();

        loop {
            line.clear();

            let bytes_read = reader
                .read_line(&mut line)
                .await
                .map_err(ServerError::Read)?;

            if bytes_read == 0 {
                break;
            }

            if line.len() as u64 > MAX_REQUEST_SIZE {
                tracing::warn!(
                    size = line.len(),
                    limit = MAX_REQUEST_SIZE,
                    "Request exceeds size limit, disconnecting"
                );
                let _ = writer.write_all(TOO_LARGE_RESPONSE.as_bytes()).await;
                let _ = writer.write_all(b"\n").await;
                let _ = writer.flush().await;
                break;
            }

            // The budget covers one request at a time.
            reader.get_mut().set_limit(MAX_REQUEST_SIZE + 1);

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = self.process_request(trimmed).await;

            let response_json = serde_json::to_string(&response).unwrap_or_else(|_| {
                r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error: failed to serialize response"},"id":null}"#.to_string()
            });

            writer
                .write_all(response_json.as_bytes())
                .await
                .map_err(ServerError::Write)?;
            writer.write_all(b"\n").await.map_err(ServerError::Write)?;
            writer.flush().await.map_err(ServerError::Write)?;
        }

        Ok(())
    }

    /// Parse, validate and dispatch one request line.
    async fn process_request(&self, request_str: &str) -> JsonRpcResponse {
        let request: JsonRpcRequest = match serde_json::from_str(request_str) {
            Ok(req) => req,
            Err(e) => {
                return JsonRpcResponse::error(
                    JsonRpcId::Null,
                    JsonRpcError::parse_error(&e.to_string()),
                );
            }
        };

        if let Err(e) = request.validate() {
            return JsonRpcResponse::error(request.id, e);
        }

        let Ok(method) = request.method.parse::<Method>() else {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::method_not_found(&request.method),
            );
        };

        let correlation_id = new_correlation_id();
        let span = tracing::info_span!(
            "request",
            correlation_id = %correlation_id,
            method = %method,
        );
        let ctx = RequestContext::new(self.config.read_timeout)
            .with_cancellation(self.shutdown.child_token())
            .with_correlation_id(correlation_id);

        self.dispatch(method, request, &ctx).instrument(span).await
    }

    async fn dispatch(
        &self,
        method: Method,
        request: JsonRpcRequest,
        ctx: &RequestContext,
    ) -> JsonRpcResponse {
        let JsonRpcRequest { params, id, .. } = request;

        if let Some(operation) = method.operation() {
            let backend_request = match serde_json::from_value::<BackendParams>(params)
                .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))
                .and_then(|p| p.into_request(operation))
            {
                Ok(r) => r,
                Err(e) => return JsonRpcResponse::error(id, e),
            };

            return match self.backend.handle(ctx, backend_request).await {
                Ok(response) => JsonRpcResponse::success(id, response),
                Err(e) => failure(id, &e),
            };
        }

        match method {
            Method::DecodeTransaction => self.handle_decode_transaction(id, params),
            Method::GetFeeRate => self.handle_get_fee_rate(id, ctx).await,
            Method::GetStatus => self.handle_get_status(id),
            Method::Create | Method::Read | Method::Update => {
                JsonRpcResponse::error(id, JsonRpcError::internal_error("unrouted operation"))
            }
        }
    }

    fn handle_decode_transaction(&self, id: JsonRpcId, params: serde_json::Value) -> JsonRpcResponse {
        let params: DecodeTransactionParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return JsonRpcResponse::error(id, JsonRpcError::invalid_params(&e.to_string())),
        };

        match codec::decode_hex(&params.tx) {
            Ok(tx) => JsonRpcResponse::success(
                id,
                TransactionSummary::from_transaction(&tx, self.backend.network()),
            ),
            Err(e) => failure(id, &PaygateError::from(e)),
        }
    }

    async fn handle_get_fee_rate(&self, id: JsonRpcId, ctx: &RequestContext) -> JsonRpcResponse {
        match self.fee.current_fee(ctx).await {
            Ok(fee) => JsonRpcResponse::success(
                id,
                GetFeeRateResult {
                    fee,
                    fee_rate: fee_to_rate(fee),
                },
            ),
            Err(e) => failure(id, &PaygateError::from(e)),
        }
    }

    fn handle_get_status(&self, id: JsonRpcId) -> JsonRpcResponse {
        let result = GetStatusResult {
            initialized: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            network: self.backend.network().name().to_string(),
            fee_endpoint: self.fee.endpoint().address(),
        };

        JsonRpcResponse::success(id, result)
    }
}

fn failure(id: JsonRpcId, error: &PaygateError) -> JsonRpcResponse {
    let status = error.status_code();
    if status >= 500 {
        tracing::warn!(status, error = %error, "request failed");
    } else {
        tracing::info!(status, error = %error, "request rejected");
    }
    JsonRpcResponse::error(id, JsonRpcError::from(error))
}
