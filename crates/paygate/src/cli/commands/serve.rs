//! # Serve Command
//!
//! `paygate serve` runs the JSON-RPC socket server in the foreground until
//! SIGINT or SIGTERM.
//!
//! ```bash
//! # Accounts persisted under [storage].directory
//! paygate serve
//!
//! # Accounts kept in memory for the life of the process
//! paygate serve --ephemeral
//! ```

use std::sync::Arc;

use paygate_core::config::Config;
use paygate_core::config_loader::prepare_socket_dir;
use paygate_core::error::{ConfigError, FeeError, StoreError};
use tokio::sync::oneshot;

use crate::backend::Backend;
use crate::fee::FeeClient;
use crate::server::socket::{PaygateServer, ServerConfig, ServerError};
use crate::storage::{AccountStore, FileAccountStore, MemoryAccountStore};

/// Errors that can occur when running the serve command.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The account store could not be opened.
    #[error("Failed to open account store: {0}")]
    Store(#[from] StoreError),

    /// The fee client could not be built.
    #[error("Failed to set up fee client: {0}")]
    Fee(#[from] FeeError),

    /// The server failed.
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Signal handling or task failure.
    #[error("Server error: {0}")]
    Runtime(String),
}

/// The `paygate serve` command handler.
#[derive(Debug, Clone)]
pub struct ServeCommand {
    /// Keep accounts in memory.
    pub ephemeral: bool,
}

impl ServeCommand {
    /// Create a new `ServeCommand`.
    #[must_use]
    pub const fn new(ephemeral: bool) -> Self {
        Self { ephemeral }
    }

    /// Build the server from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError`] if the network, socket directory, storage
    /// directory or fee endpoint is unusable.
    pub fn build_server(&self, config: &Config) -> Result<PaygateServer, ServeError> {
        let network = config.network.parameters()?;

        let store: Arc<dyn AccountStore> = if self.ephemeral {
            Arc::new(MemoryAccountStore::new())
        } else {
            Arc::new(FileAccountStore::with_path(&config.storage.directory)?)
        };

        let fee = FeeClient::new(config.fee.endpoint())?;
        prepare_socket_dir(config)?;
        let server_config = ServerConfig::from_config(config)?;

        Ok(PaygateServer::new(
            server_config,
            Backend::new(store, network),
            fee,
        ))
    }

    /// Run the server until a shutdown signal arrives.
    ///
    /// 1. Builds the store, backend and fee client
    /// 2. Starts the socket server
    /// 3. Waits for SIGINT/SIGTERM, or for the server to fail
    /// 4. Signals shutdown and waits for the server to stop
    ///
    /// # Errors
    ///
    /// Returns [`ServeError`] if setup fails or the server cannot bind.
    pub async fn run(&self, config: &Config) -> Result<(), ServeError> {
        let server = self.build_server(config)?;

        display_startup_message(server.config(), config, self.ephemeral);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let mut server_task = tokio::spawn(server.run(shutdown_rx));

        tokio::select! {
            result = &mut server_task => {
                return flatten(result);
            }
            signal = wait_for_shutdown() => {
                signal?;
            }
        }

        tracing::info!("Server shutting down gracefully");
        let _ = shutdown_tx.send(());
        flatten(server_task.await)?;

        println!("\nServer stopped.");
        Ok(())
    }
}

fn flatten(
    result: Result<Result<(), ServerError>, tokio::task::JoinError>,
) -> Result<(), ServeError> {
    match result {
        Ok(inner) => inner.map_err(ServeError::from),
        Err(e) => Err(ServeError::Runtime(format!("server task failed: {e}"))),
    }
}

fn display_startup_message(server: &ServerConfig, config: &Config, ephemeral: bool) {
    let storage = if ephemeral {
        "memory (ephemeral)".to_string()
    } else {
        config.storage.directory.clone()
    };

    println!("paygate {}", env!("CARGO_PKG_VERSION"));
    println!("  socket:  {}", server.socket_path.display());
    println!("  network: {}", config.network.network);
    println!("  storage: {storage}");
    println!("  fee:     {}", config.fee.endpoint());
    println!("\nPress Ctrl-C to stop.");
}

async fn wait_for_shutdown() -> Result<(), ServeError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            ServeError::Runtime(format!("failed to register SIGTERM handler: {e}"))
        })?;

        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
            ServeError::Runtime(format!("failed to register SIGINT handler: {e}"))
        })?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| ServeError::Runtime(format!("failed to wait for Ctrl+C: {e}")))?;

        tracing::info!("Received Ctrl+C");
    }

    Ok(())
}
