//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `entity-patch` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `entity_patch` library.
//!
//! Commands that read a model share [`ModelArgs`].

pub mod apply;
pub mod resources;
pub mod serialize;
pub mod tree;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use entity_patch::config;
use entity_patch::model::Entity;
use entity_patch::schema::Schema;

/// Input files shared by every command that reads a model.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path to the schema file declaring the node kinds.
    #[arg(short, long, value_name = "FILE", env = "ENTITY_PATCH_SCHEMA")]
    pub schema: PathBuf,

    /// Path to the model file (YAML or JSON) holding the entity tree.
    #[arg(short, long, value_name = "FILE")]
    pub model: PathBuf,
}

impl ModelArgs {
    /// Compile the schema and build the model's entity tree.
    pub fn load(&self) -> Result<Entity> {
        let schema = Schema::from_file(&self.schema).with_context(|| {
            format!("Failed to load schema from {}", self.schema.display())
        })?;
        log::info!(
            "loaded {} kind(s) from {}",
            schema.len(),
            self.schema.display()
        );
        config::from_file(&schema, &self.model)
            .with_context(|| format!("Failed to load model from {}", self.model.display()))
    }
}
