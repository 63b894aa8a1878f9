//! # Resources Command Implementation
//!
//! This module implements the `resources` subcommand, which lists every
//! resource owning at least one anchor of a model, one per line, sorted.

use anyhow::Result;
use clap::Args;

use entity_patch::model::Entity;
use entity_patch::serialize::collect_resources;

use super::ModelArgs;

/// List the resources that own part of a model
#[derive(Args, Debug)]
pub struct ResourcesArgs {
    #[command(flatten)]
    pub input: ModelArgs,
}

/// Execute the `resources` command.
pub fn execute(args: ResourcesArgs) -> Result<()> {
    let tree = args.input.load()?;
    for line in resource_lines(&tree)? {
        println!("{}", line);
    }
    Ok(())
}

fn resource_lines(tree: &Entity) -> Result<Vec<String>> {
    Ok(collect_resources(tree)?
        .into_iter()
        .map(|resource| resource.to_string())
        .collect())
}
