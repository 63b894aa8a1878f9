//! # Serialize Command Implementation
//!
//! This module implements the `serialize` subcommand, which loads a model and
//! prints the patch operations for it as JSON.
//!
//! ## Modes
//!
//! - `--resource <ID>`: the operations owned by one resource, as a list.
//! - `--all`: the operations of every resource, as an object keyed by resource.
//! - `--inline`: the whole tree as one operation at the root path.

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use serde_json::Value;
use std::path::PathBuf;

use entity_patch::model::{Entity, ResourceId};
use entity_patch::serialize::{Serializer, SerializerOptions, DEFAULT_MAX_DEPTH};

use super::ModelArgs;

/// Serialize a model into patch operations
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("mode").required(true).args(["resource", "all", "inline"])))]
pub struct SerializeArgs {
    #[command(flatten)]
    pub input: ModelArgs,

    /// Emit the operations owned by this resource.
    #[arg(short, long, value_name = "ID")]
    pub resource: Option<String>,

    /// Emit the operations of every resource, keyed by resource.
    #[arg(short, long)]
    pub all: bool,

    /// Emit the whole tree as a single operation.
    #[arg(long)]
    pub inline: bool,

    /// Maximum nesting depth before the walk is aborted.
    #[arg(long, value_name = "NUM", env = "ENTITY_PATCH_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Print compact JSON instead of pretty-printed JSON.
    #[arg(long)]
    pub compact: bool,

    /// Write the output to a file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Execute the `serialize` command.
pub fn execute(args: SerializeArgs) -> Result<()> {
    let tree = args.input.load()?;
    let value = render(&args, &tree)?;

    let text = if args.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", text))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("wrote operations to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

/// Produce the JSON output for the selected mode.
fn render(args: &SerializeArgs, tree: &Entity) -> Result<Value> {
    let serializer = Serializer::with_options(SerializerOptions {
        max_depth: args.max_depth,
    });

    let value = if let Some(resource) = &args.resource {
        let operations = serializer.serialize_for_resource(tree, &ResourceId::new(resource.as_str()))?;
        if operations.is_empty() {
            log::warn!("resource '{}' owns no part of the model", resource);
        }
        serde_json::to_value(operations)?
    } else if args.all {
        serde_json::to_value(serializer.serialize_all_resources(tree)?)?
    } else {
        serde_json::to_value(serializer.serialize_operation(tree)?)?
    };
    Ok(value)
}
