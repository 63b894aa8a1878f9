//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Entity Patch - Serialize entity trees into per-resource patch operations
#[derive(Parser, Debug)]
#[command(name = "entity-patch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    ///
    /// `RUST_LOG` takes precedence when set.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serialize a model into patch operations
    Serialize(commands::serialize::SerializeArgs),

    /// List the resources that own part of a model
    Resources(commands::resources::ResourcesArgs),

    /// Display the anchors of a model with their paths and resources
    Tree(commands::tree::TreeArgs),

    /// Apply patch operations to a JSON document
    Apply(commands::apply::ApplyArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Serialize(args) => commands::serialize::execute(args),
            Commands::Resources(args) => commands::resources::execute(args),
            Commands::Tree(args) => commands::tree::execute(args),
            Commands::Apply(args) => commands::apply::execute(args),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // No-op when a logger is already installed.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
