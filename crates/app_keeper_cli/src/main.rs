use std::path::PathBuf;

use app_keeper_cli::commands::{backfill_cmd, token_cmd, token_cmd::TokenArgs};
use app_keeper_cli::config::{get_config_path, AppConfig};
use app_keeper_cli::errors::Error;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// App Keeper CLI: keep GitHub App installations and tokens in order
#[derive(Parser, Debug)]
#[command(name = "app-keeper")]
#[command(about = "Sync GitHub App installations and issue installation tokens", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync the installations of every configured app with GitHub
    Backfill,

    /// Issue an installation access token
    Token(TokenArgs),

    /// Show the CLI version
    Version,
}

fn load_config(path: Option<&str>) -> Result<AppConfig, Error> {
    let path: PathBuf = get_config_path(path);
    AppConfig::load(&path)
}

async fn run(cli: Cli) -> Result<i32, Error> {
    match cli.command {
        Commands::Backfill => {
            let config = load_config(cli.config.as_deref())?;
            let report = backfill_cmd::execute(&config).await?;
            print!("{report}");
            Ok(if report.succeeded() { 0 } else { 1 })
        }
        Commands::Token(args) => {
            let config = load_config(cli.config.as_deref())?;
            let issued = token_cmd::execute(&config, &args).await?;
            println!("{}", issued.token);
            match issued.expires_at {
                Some(expires_at) => eprintln!("expires at {}", expires_at.to_rfc3339()),
                None => eprintln!("token does not expire"),
            }
            Ok(0)
        }
        Commands::Version => {
            println!(
                "app-keeper version {}",
                option_env!("APP_KEEPER_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            );
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("APP_KEEPER_LOG"))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Error: {e}");
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
