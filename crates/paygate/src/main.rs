//! # paygate
//!
//! Policy-gated Bitcoin payment signing service.
//!
//! ## Usage
//!
//! ```bash
//! # Write the default configuration
//! paygate init
//!
//! # Create two accounts
//! paygate account create alice --limit 100000
//! paygate account create bob
//!
//! # Sign a payment from alice to bob
//! paygate pay -s alice -d bob -a 50000 -t 0100000001...
//!
//! # Run the socket server
//! paygate serve
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::future::Future;

use clap::Parser;
use paygate::cli::commands::{
    load_settings, AccountCommand, FeeCommand, InitCommand, PayCommand, ServeCommand,
    TxDecodeCommand, EXIT_ERROR, EXIT_SUCCESS,
};
use paygate::cli::{Cli, Commands, TxCommands};
use paygate::logging::{init_logging, LogConfig, LogError, LogGuard};
use paygate_core::config::{Config, LoggingConfig};

/// Set up logging from the `[logging]` section and the `-v` count.
fn setup_logging(config: &LoggingConfig, verbose: u8) -> Result<LogGuard, LogError> {
    init_logging(&LogConfig::from_config(config, verbose)?)
}

/// Run `future` on a fresh multi-threaded runtime.
fn block_on<F: Future>(future: F) -> F::Output {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(future),
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_ERROR);
        }
    }
}

/// Print the error and return its exit code.
fn finish<E: std::fmt::Display>(result: Result<(), E>, exit_code: impl Fn(&E) -> i32) -> i32 {
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code(&e)
        }
    }
}

/// Main entry point for paygate.
fn main() {
    let cli = Cli::parse();

    let config = if matches!(cli.command, Commands::Init { .. }) {
        Config::default()
    } else {
        match load_settings(cli.config.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(EXIT_ERROR);
            }
        }
    };

    let guard = match setup_logging(&config.logging, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };

    let code = match cli.command {
        Commands::Init { force } => {
            let cmd = InitCommand::new(force, cli.config);
            finish(cmd.run(), |_| EXIT_ERROR)
        }
        Commands::Serve { ephemeral } => {
            let cmd = ServeCommand::new(ephemeral);
            finish(block_on(cmd.run(&config)), |_| EXIT_ERROR)
        }
        Commands::Account { command } => {
            let cmd = AccountCommand::new(command);
            finish(block_on(cmd.run(&config)), |e| e.exit_code())
        }
        Commands::Pay(args) => {
            let cmd = PayCommand::new(args);
            finish(block_on(cmd.run(&config)), |e| e.exit_code())
        }
        Commands::Fee => {
            let cmd = FeeCommand::new();
            finish(block_on(cmd.run(&config)), |e| e.exit_code())
        }
        Commands::Tx {
            command: TxCommands::Decode { transaction },
        } => {
            let cmd = TxDecodeCommand::new(transaction);
            finish(cmd.run(&config), |e| e.exit_code())
        }
    };

    // exit() skips destructors; flush buffered file logs first.
    drop(guard);
    std::process::exit(code);
}
