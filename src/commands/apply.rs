//! Apply command implementation
//!
//! Applies patch operations produced by `serialize` to a JSON document, the
//! way the owning resource would. The operations file holds either a list of
//! operations (`serialize --resource`) or an object of lists keyed by
//! resource (`serialize --all`). Operations of several resources are applied
//! parents first, so a `replace` never wipes out a node another resource owns.

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use entity_patch::patch::{apply_operations, order_parents_first, PatchOperation};

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the operations file (JSON)
    #[arg(long, value_name = "FILE")]
    pub operations: PathBuf,

    /// Path to the document to patch (JSON); starts from `{}` when omitted
    #[arg(short, long, value_name = "FILE")]
    pub document: Option<PathBuf>,

    /// Write the patched document here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OperationsFile {
    List(Vec<PatchOperation>),
    ByResource(BTreeMap<String, Vec<PatchOperation>>),
}

impl OperationsFile {
    fn into_operations(self) -> Result<Vec<PatchOperation>> {
        match self {
            OperationsFile::List(operations) => Ok(operations),
            OperationsFile::ByResource(by_resource) => {
                Ok(order_parents_first(by_resource.into_values().flatten())?)
            }
        }
    }
}

/// Execute the apply command
pub fn execute(args: ApplyArgs) -> Result<()> {
    let patched = patch_document(&args)?;
    let text = serde_json::to_string_pretty(&patched)?;
    match &args.output {
        Some(path) => std::fs::write(path, format!("{}\n", text))
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", text),
    }
    Ok(())
}

fn patch_document(args: &ApplyArgs) -> Result<Value> {
    let content = std::fs::read_to_string(&args.operations).with_context(|| {
        format!("Failed to read operations from {}", args.operations.display())
    })?;
    let operations: OperationsFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid operations file {}", args.operations.display()))?;
    let operations = operations.into_operations()?;

    let mut document = match &args.document {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read document {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON document {}", path.display()))?
        }
        None => Value::Object(Default::default()),
    };

    log::debug!("applying {} operation(s)", operations.len());
    apply_operations(&mut document, &operations)?;
    Ok(document)
}
