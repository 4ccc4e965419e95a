// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tollgate - a prepaid token ledger with a profit-margin guard.
//!
//! This is the binary entry point. It stands in for the external auth
//! collaborator: the caller names an account id and the CLI trusts it.

mod commands;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Tollgate - a prepaid token ledger with a profit-margin guard.
#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Create the database and seed the default model catalog.
    Init,
    /// List the model catalog.
    Models,
    /// Register a new account.
    OpenAccount {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        /// Open an admin account with the configured token grant.
        #[arg(long)]
        admin: bool,
    },
    /// Buy tokens for an account.
    Purchase {
        #[arg(long)]
        account: String,
        #[arg(long)]
        tokens: u64,
        /// Price paid, in monetary units.
        #[arg(long)]
        price: Decimal,
    },
    /// Charge one use of a model to an account.
    Charge {
        #[arg(long)]
        account: String,
        #[arg(long)]
        model: String,
    },
    /// Show the profit guard's current decision for an account.
    Status {
        #[arg(long)]
        account: String,
    },
    /// Admin overview of every account.
    Report {
        /// Admin account to run the report as.
        #[arg(long = "as")]
        as_account: String,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tollgate_config::load_and_validate_path(path),
        None => tollgate_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tollgate_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.ledger.log_level);

    match commands::run(cli.command, &config, cli.plain).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("tollgate: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays JSON.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tollgate={log_level},tollgate_ledger={log_level},tollgate_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn purchase_parses_decimal_price() {
        let cli = Cli::try_parse_from([
            "tollgate", "purchase", "--account", "a1", "--tokens", "500", "--price", "4.99",
        ])
        .unwrap();
        let Commands::Purchase { tokens, price, .. } = cli.command else {
            panic!("expected purchase");
        };
        assert_eq!(tokens, 500);
        assert_eq!(price, Decimal::new(499, 2));
    }

    #[test]
    fn report_takes_admin_account_and_global_flags() {
        let cli =
            Cli::try_parse_from(["tollgate", "report", "--as", "root", "--json", "--plain"])
                .unwrap();
        assert!(cli.plain);
        assert!(matches!(
            cli.command,
            Commands::Report { ref as_account, json: true } if as_account == "root"
        ));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = tollgate_config::load_and_validate_str("").expect("default config is valid");
        assert_eq!(config.ledger.log_level, "info");
    }
}
