//! # CLI Module
//!
//! Command-line interface for paygate.
//!
//! ## Module Structure
//!
//! - [`args`] - Argument parsing and CLI structure definitions
//! - [`commands`] - Command handler implementations
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use paygate::cli::{Cli, Commands};
//!
//! let cli = Cli::parse();
//!
//! match cli.command {
//!     Commands::Init { force } => {
//!         // Write the default configuration
//!     }
//!     Commands::Fee => {
//!         // Print the current fee rate
//!     }
//!     _ => {}
//! }
//! ```
//!
//! ## Commands
//!
//! - `paygate init [--force]` - Write `~/.paygate/config.toml`
//! - `paygate serve [--ephemeral]` - Run the JSON-RPC socket server
//! - `paygate account create <NAME> [--limit N] [--blacklist A,B] [--whitelist A,B]`
//! - `paygate account show <NAME>`
//! - `paygate account update <NAME> [--limit N] [--blacklist A,B] [--whitelist A,B]`
//! - `paygate pay -s <SRC> -d <DST> -a <SATOSHIS> -t <TX_HEX> [--format hex|json]`
//! - `paygate fee` - Print the current fee rate
//! - `paygate tx decode <TX_HEX>` - Summarize a raw transaction

pub mod args;
pub mod commands;

pub use args::{
    AccountArgs, AccountCommands, Cli, Commands, OutputFormat, PayArgs, TxCommands,
};
