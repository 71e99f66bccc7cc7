//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// classroom-batch - batched content migration for Google Classroom
#[derive(Parser, Debug)]
#[command(name = "classroom-batch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "classroom-batch.toml",
        env = "CLASSROOM_BATCH_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CLASSROOM_BATCH_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an operations manifest through the batch endpoint
    Run(commands::run::RunArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
