// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! wxbridge - WeChat Web gateway for a multi-platform bot bus.
//!
//! This binary inspects and edits the gateway's configuration and persisted
//! accounts. The gateway itself runs inside the host that provides the
//! session client and the bus.

mod accounts;

use clap::{Parser, Subcommand};
use wxbridge_config::model::BridgeConfig;

/// wxbridge - WeChat Web gateway for a multi-platform bot bus.
#[derive(Parser, Debug)]
#[command(name = "wxbridge", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage wxbridge configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Inspect and edit persisted accounts.
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate configuration and print the effective settings.
    Check,
}

#[derive(Subcommand, Debug)]
enum AccountsAction {
    /// List stored accounts.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Remove an account id from the store; takes effect after restart.
    Remove {
        /// Canonical account id, e.g. wx_123456.
        id: String,
    },
}

fn load(cli: &Cli) -> BridgeConfig {
    let result = match &cli.config {
        Some(path) => wxbridge_config::load_and_validate_path(path),
        None => wxbridge_config::load_and_validate(),
    };
    match result {
        Ok(config) => config,
        Err(errors) => {
            wxbridge_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load(&cli);
    init_tracing(&config.logging.level);

    let result = match cli.command {
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            println!("wxbridge: config ok");
            println!("  wechat.data_dir = {}", config.wechat.data_dir);
            println!("  wechat.account_store = {}", config.wechat.account_store);
            println!(
                "  wechat.error_suppression_secs = {}",
                config.wechat.error_suppression_secs
            );
            println!("  wechat.message_grace_ms = {}", config.wechat.message_grace_ms);
            println!("  logging.level = {}", config.logging.level);
            Ok(())
        }
        Some(Commands::Accounts {
            action: AccountsAction::List { json },
        }) => accounts::run_list(&config.wechat, json).await,
        Some(Commands::Accounts {
            action: AccountsAction::Remove { id },
        }) => accounts::run_remove(&config.wechat, &id).await.map(|_| ()),
        None => {
            println!("wxbridge: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wxbridge={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
