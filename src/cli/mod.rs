pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "estuary")]
#[command(about = "Sync social-media RSS mirrors into Notion", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: std::path::PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync all configured users, or a single user by id
    Sync {
        /// User id to sync (default: everyone)
        user: Option<String>,
    },
    /// List configured users
    List,
}
