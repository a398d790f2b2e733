use std::path::PathBuf;

use clap::{Parser, Subcommand};
use famgoals_shared::domain::WaterUnit;

const HELP_EPILOG: &str = r#"Config resolution order:
  1) --config/-c PATH
  2) $FAMGOALS_CONFIG
  3) Platform default, e.g. ~/.config/famgoals/agent.yaml

The session token is kept in the OS keyring under the server URL.
`login --token-file` keeps it in an owner-only `token` file next to the
config instead, for hosts without a keyring.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "famgoals-client",
    version,
    about = "Health sync agent for Family Goals",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Optional subcommand. Without one, runs the sync loop.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in as a family and save the token
    Login {
        /// Server URL (e.g., http://127.0.0.1:5151). Falls back to config or prompt.
        #[arg(long)]
        server: Option<String>,
        /// Family name. Falls back to prompt.
        #[arg(long)]
        family: Option<String>,
        /// Health export file to read samples from
        #[arg(long)]
        health_export: Option<PathBuf>,
        /// Store the token in a file next to the config instead of the keyring
        #[arg(long)]
        token_file: bool,
    },
    /// Pick the member whose health data is synced; asks for their PIN
    SelectMember {
        #[arg(long)]
        member_id: String,
    },
    /// Push today's readings once and exit
    Sync,
    /// Record a drink in the health store and push the new daily total
    LogWater {
        amount: f64,
        /// ml, L, oz or cups
        #[arg(long, default_value = "ml")]
        unit: WaterUnit,
    },
    /// End the server session and forget the token
    Logout,
}
