use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Container Warden - one sandbox container per chat user")]
pub struct Cli {
    /// Config file path (defaults to warden.yaml, warden.yml or config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Chat gateway token, overrides `discord_token` from the config
    #[arg(long, env = "WARDEN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile, then answer commands read from stdin
    ///
    /// Each line is `<user_id> <guild_id|-> <message>` or `depart <user_id>`.
    Serve,
    /// Reconcile stored records with the runtime once and exit
    Reconcile {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show stored container records and blacklist entries
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration file
    Validate,
}
