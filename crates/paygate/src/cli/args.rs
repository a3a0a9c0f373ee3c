//! # CLI Argument Definitions
//!
//! Command-line structure, defined with clap derive macros.
//!
//! - `paygate init` - Write the default configuration
//! - `paygate serve` - Run the JSON-RPC socket server
//! - `paygate account create|show|update` - Manage accounts
//! - `paygate pay` - Sign a payment between two accounts
//! - `paygate fee` - Query the fee-rate service
//! - `paygate tx decode <TX_HEX>` - Summarize a raw transaction
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level
//! - `-c, --config <PATH>` - Path to configuration file

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Policy-gated Bitcoin payment signing service.
///
/// Paygate holds per-account signing keys, checks every payment against the
/// source account's spend limit, blacklist and whitelist, and signs the
/// unsigned transaction only when the policy allows it.
#[derive(Debug, Parser)]
#[command(name = "paygate")]
#[command(author, version, about = "Policy-gated Bitcoin payment signing service")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    ///
    /// Overrides the `[logging]` level:
    /// - `-v` - Show info messages
    /// - `-vv` - Show debug messages
    /// - `-vvv` - Show trace messages
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    ///
    /// Defaults to `~/.paygate/config.toml`.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Run the JSON-RPC server on the configured Unix socket
    ///
    /// Runs in the foreground until SIGINT or SIGTERM.
    Serve {
        /// Keep accounts in memory instead of the storage directory
        ///
        /// Accounts created while the server runs are lost when it stops.
        #[arg(long)]
        ephemeral: bool,
    },

    /// Account management
    Account {
        /// Account command to execute
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Sign a payment from one account to another
    Pay(PayArgs),

    /// Print the current fee rate in satoshis per byte
    Fee,

    /// Raw transaction tools
    Tx {
        /// Transaction command to execute
        #[command(subcommand)]
        command: TxCommands,
    },
}

/// Account subcommands.
#[derive(Debug, Subcommand)]
pub enum AccountCommands {
    /// Create an account with a fresh signing key
    Create(AccountArgs),

    /// Show an account's address and policy
    Show {
        /// Account name
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Replace an account's policy fields
    Update(AccountArgs),
}

/// Account name and policy fields.
#[derive(Debug, Clone, Args)]
pub struct AccountArgs {
    /// Account name (ASCII letters, digits, `-` and `_`)
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Per-transaction spend limit in satoshis (0 means no limit)
    #[arg(short, long, value_name = "SATOSHIS")]
    pub limit: Option<u64>,

    /// Comma-separated destination addresses to refuse
    #[arg(short, long, value_name = "ADDRESSES")]
    pub blacklist: Option<String>,

    /// Comma-separated destination addresses to allow exclusively
    #[arg(short, long, value_name = "ADDRESSES")]
    pub whitelist: Option<String>,
}

/// Arguments of `paygate pay`.
#[derive(Debug, Clone, Args)]
pub struct PayArgs {
    /// Source account name
    #[arg(short, long, value_name = "NAME")]
    pub source: String,

    /// Destination account name
    #[arg(short, long, value_name = "NAME")]
    pub destination: String,

    /// Amount in satoshis, checked against the source's limit
    #[arg(short, long, value_name = "SATOSHIS")]
    pub amount: u64,

    /// Unsigned transaction hex (with or without 0x prefix)
    #[arg(short, long, value_name = "TX_HEX")]
    pub tx: String,

    /// Comma-separated additional signers (accepted and ignored)
    #[arg(long, value_name = "NAMES")]
    pub additional_signers: Option<String>,

    /// Output format
    ///
    /// - `hex` - Signed transaction hex (default)
    /// - `json` - Source address, transaction hash and signed transaction
    #[arg(short, long, default_value = "hex", value_name = "FORMAT")]
    pub format: OutputFormat,
}

/// Transaction subcommands.
#[derive(Debug, Subcommand)]
pub enum TxCommands {
    /// Print a JSON summary of a raw transaction
    Decode {
        /// Transaction hex (with or without 0x prefix)
        #[arg(value_name = "TX_HEX")]
        transaction: String,
    },
}

/// Output format for signed payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Raw hexadecimal output
    #[default]
    Hex,
    /// JSON output
    Json,
}
