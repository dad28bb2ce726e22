//! Crowdsale CLI Application
//!
//! A command-line interface for deploying and operating token sales.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use crowdsale::cli::{self, AppState};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crowdsale")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A fixed-price, whitelist-gated token sale", long_about = None)]
struct Cli {
    /// Data directory for chain storage
    #[arg(short, long, default_value = ".crowdsale_data")]
    data_dir: PathBuf,

    /// Execute at this time instead of now (RFC 3339)
    #[arg(long, global = true)]
    at: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a token and a crowdsale holding its whole supply
    Deploy {
        /// Operator address
        #[arg(short, long)]
        operator: String,

        /// JSON deployment config (defaults to the Henry token sale)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Credit native coins to an account
    Fund {
        /// Account to credit
        #[arg(short, long)]
        account: String,

        /// Amount in coins
        #[arg(short = 'n', long)]
        amount: String,
    },

    /// Add an account to a sale's whitelist
    Whitelist {
        /// Operator address
        #[arg(short, long)]
        operator: String,

        /// Sale address
        #[arg(short, long)]
        sale: String,

        /// Account to whitelist
        #[arg(short, long)]
        account: String,
    },

    /// Change a sale's price
    SetPrice {
        /// Operator address
        #[arg(short, long)]
        operator: String,

        /// Sale address
        #[arg(short, long)]
        sale: String,

        /// Coins per whole token
        #[arg(short, long)]
        price: String,
    },

    /// Buy tokens from a sale
    Buy {
        /// Buyer address
        #[arg(short, long)]
        buyer: String,

        /// Sale address
        #[arg(short, long)]
        sale: String,

        /// Whole tokens to buy
        #[arg(short, long)]
        quantity: String,

        /// Coins to attach (defaults to the exact cost)
        #[arg(short, long)]
        pay: Option<String>,
    },

    /// Send coins; sending to a sale buys tokens
    Send {
        /// Sender address
        #[arg(short, long)]
        from: String,

        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Amount in coins
        #[arg(short = 'n', long)]
        amount: String,
    },

    /// Close a sale and sweep its balances to the operator
    Finalize {
        /// Operator address
        #[arg(short, long)]
        operator: String,

        /// Sale address
        #[arg(short, long)]
        sale: String,
    },

    /// Display chain or sale information
    Info {
        /// Sale address
        #[arg(short, long)]
        sale: Option<String>,
    },

    /// Show coin and token balances of an account
    Balance {
        /// Account address
        address: String,
    },

    /// List recent events
    Events {
        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        count: usize,

        /// Only events with this name (Transfer, Buy, Finalize, ...)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List saved backups of the chain
    Backups,

    /// Replace the chain with a saved backup
    Restore {
        /// Backup index (0 is the newest)
        #[arg(short, long)]
        backup: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let now = cli.at.unwrap_or_else(Utc::now);

    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Deploy { operator, config } => {
            cli::cmd_deploy(&mut state, &operator, config.as_deref(), now)?;
        }

        Commands::Fund { account, amount } => {
            cli::cmd_fund(&mut state, &account, &amount)?;
        }

        Commands::Whitelist {
            operator,
            sale,
            account,
        } => {
            cli::cmd_whitelist(&mut state, &operator, &sale, &account, now)?;
        }

        Commands::SetPrice {
            operator,
            sale,
            price,
        } => {
            cli::cmd_set_price(&mut state, &operator, &sale, &price, now)?;
        }

        Commands::Buy {
            buyer,
            sale,
            quantity,
            pay,
        } => {
            cli::cmd_buy(&mut state, &buyer, &sale, &quantity, pay.as_deref(), now)?;
        }

        Commands::Send { from, to, amount } => {
            cli::cmd_send(&mut state, &from, &to, &amount, now)?;
        }

        Commands::Finalize { operator, sale } => {
            cli::cmd_finalize(&mut state, &operator, &sale, now)?;
        }

        Commands::Info { sale } => {
            cli::cmd_info(&state, sale.as_deref(), now)?;
        }

        Commands::Balance { address } => {
            cli::cmd_balance(&state, &address)?;
        }

        Commands::Events { count, name } => {
            cli::cmd_events(&state, count, name.as_deref())?;
        }

        Commands::Backups => {
            cli::cmd_backups(&state)?;
        }

        Commands::Restore { backup } => {
            cli::cmd_restore(&mut state, backup)?;
        }
    }

    Ok(())
}
