//! Percolator Protocol CLI
//!
//! Inspects a slab and submits the trader instructions against it.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use commands::*;
use config::{Config, OutputFormat, Overrides, Settings};

/// Percolator Protocol CLI
#[derive(Parser)]
#[command(name = "percolator")]
#[command(author = "Percolator Protocol")]
#[command(version = "0.1.0")]
#[command(about = "Inspect Percolator slabs and submit trader instructions", long_about = None)]
struct Cli {
    /// RPC endpoint URL
    #[arg(short, long, env = "SOLANA_RPC_URL")]
    rpc_url: Option<String>,

    /// Path to keypair file
    #[arg(short, long, env = "KEYPAIR_PATH")]
    keypair: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Percolator program id
    #[arg(long, env = "PERCOLATOR_PROGRAM_ID")]
    program_id: Option<String>,

    /// Slab address
    #[arg(long, env = "PERCOLATOR_SLAB")]
    slab: Option<String>,

    /// Submit without asking for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Slab inspection commands
    Slab {
        #[command(subcommand)]
        command: SlabCommands,
    },

    /// Account and trading commands
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum SlabCommands {
    /// Show header, market config and engine state
    Status,
    /// List live accounts
    Accounts {
        /// Only accounts owned by this address
        #[arg(long)]
        owner: Option<String>,
        /// Only LP accounts
        #[arg(long, conflicts_with = "users")]
        lps: bool,
        /// Only user accounts
        #[arg(long)]
        users: bool,
        /// Collateral decimals used to display capital
        #[arg(long, default_value = "6")]
        decimals: u8,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a user account
    InitUser {
        /// New-account fee in collateral base units
        #[arg(long, default_value = "0")]
        fee: u64,
    },
    /// Open an LP account backed by a matcher
    InitLp {
        /// Matcher program address
        matcher_program: String,
        /// Matcher context account
        matcher_context: String,
        /// New-account fee in collateral base units
        #[arg(long, default_value = "0")]
        fee: u64,
    },
    /// Deposit collateral
    Deposit {
        /// Amount in collateral base units
        amount: u64,
        /// Account index (defaults to the wallet's only user account)
        #[arg(long)]
        index: Option<u16>,
    },
    /// Withdraw collateral
    Withdraw {
        /// Amount in collateral base units
        amount: u64,
        /// Account index (defaults to the wallet's only user account)
        #[arg(long)]
        index: Option<u16>,
    },
    /// Trade against an LP (positive size = long)
    Trade {
        /// LP account index
        lp_index: u16,
        /// Signed position delta
        #[arg(allow_hyphen_values = true)]
        size: i128,
        /// Account index (defaults to the wallet's only user account)
        #[arg(long)]
        index: Option<u16>,
        /// LP owner keypair; trades directly without the matcher when given
        #[arg(long)]
        lp_keypair: Option<String>,
    },
    /// Show the wallet's accounts on the slab
    Positions {
        /// Collateral decimals used to display capital
        #[arg(long, default_value = "6")]
        decimals: u8,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set RPC endpoint
    SetRpc {
        /// RPC URL
        url: String,
    },
    /// Set keypair path
    SetKeypair {
        /// Keypair file path
        path: String,
    },
    /// Set program id
    SetProgram {
        /// Program address
        address: String,
    },
    /// Set default slab
    SetSlab {
        /// Slab address
        address: String,
    },
    /// Initialize configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let settings = Settings::resolve(
        config.clone(),
        Overrides {
            rpc_url: cli.rpc_url,
            keypair_path: cli.keypair,
            output: cli.output,
            program_id: cli.program_id,
            slab: cli.slab,
            assume_yes: cli.yes,
        },
    );

    if settings.output == OutputFormat::Text {
        println!(
            "{} {}",
            style("Percolator Protocol CLI").bold().cyan(),
            style("v0.1.0").dim()
        );
    }

    match cli.command {
        Commands::Slab { command } => handle_slab_command(&settings, command).await,
        Commands::Account { command } => handle_account_command(&settings, command).await,
        Commands::Config { command } => handle_config_command(config, settings.output, command),
    }
}
