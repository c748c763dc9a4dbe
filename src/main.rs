mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use container_warden::{Config, Error as WardenError, Parser as ConfigParser};
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(warden_error) = e.downcast_ref::<WardenError>() {
            eprintln!("Error: {}", warden_error);
            if let Some(suggestion) = warden_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    match cli.command {
        // Validation reports its own load failures
        Commands::Validate => {
            commands::run_validate(cli.config, cli.token.is_some(), &output::CliOutput)
        }
        Commands::Serve => {
            let config = load_config(cli.config, cli.token)?;
            commands::run_serve(&config, &output::CliOutput).await
        }
        Commands::Reconcile { json } => {
            let config = load_config(cli.config, cli.token)?;
            commands::run_reconcile(&config, json, &output::CliOutput).await
        }
        Commands::List { json } => {
            let config = load_config(cli.config, cli.token)?;
            commands::run_list(&config, json, &output::CliOutput).await
        }
    }
}

fn load_config(path: Option<PathBuf>, token: Option<String>) -> anyhow::Result<Config> {
    let parser = ConfigParser::new();
    let config_path = match path {
        Some(path) => path,
        None => parser.find_config_file()?,
    };
    let mut config = parser.load_config(&config_path)?;
    if let Some(token) = token {
        config.discord_token = Some(token);
    }
    config.validate()?;
    tracing::debug!("Loaded configuration from {}", config_path.display());
    Ok(config)
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
