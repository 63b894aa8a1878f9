//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays the entity
//! tree of a model in a hierarchical format.
//!
//! ## Functionality
//!
//! - **Anchor paths**: every anchor is shown with its path and owning resource
//! - **Inlined nodes**: chain descendants are marked with the path of the
//!   anchor whose value they are folded into
//! - **Depth Control**: Supports `--depth` flag to limit tree depth

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use entity_patch::model::{ConfigNode, ResourceId};
use entity_patch::path::{child_segments, render_path, PathSegment};
use entity_patch::resolve::resolve;

use super::ModelArgs;

/// Display the anchors of a model with their paths and resources
#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub input: ModelArgs,

    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree. Use 0 to show only the root.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs) -> Result<()> {
    let tree = args.input.load()?;
    let root = build_tree_node(
        &tree,
        None,
        &mut Vec::new(),
        false,
        args.depth.unwrap_or(usize::MAX),
        0,
    )?;
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

/// Build a display node for `node` and its descendants.
fn build_tree_node(
    node: &dyn ConfigNode,
    inherited: Option<&ResourceId>,
    segments: &mut Vec<PathSegment>,
    inlined: bool,
    max_depth: usize,
    current_depth: usize,
) -> Result<TreeNode> {
    let resource = resolve(node, inherited)?;
    let path = render_path(segments);
    let label = if inlined {
        format!("{} (inlined at {}) [{}]", node.kind_name(), path, resource)
    } else {
        format!("{} {} [{}]", node.kind_name(), path, resource)
    };

    let mut children = Vec::new();
    if current_depth < max_depth {
        for slot in node.relation_slots() {
            let related = node.related(&slot.name);
            if inlined || !slot.is_anchor() {
                for child in related {
                    children.push(build_tree_node(
                        child,
                        Some(resource),
                        segments,
                        true,
                        max_depth,
                        current_depth + 1,
                    )?);
                }
                continue;
            }
            let slot_segments = child_segments(&slot.name, &slot.cardinality, &related)?;
            for (child, segment) in related.into_iter().zip(slot_segments) {
                segments.push(segment);
                let built = build_tree_node(
                    child,
                    Some(resource),
                    segments,
                    false,
                    max_depth,
                    current_depth + 1,
                );
                segments.pop();
                children.push(built?);
            }
        }
    }

    Ok(TreeNode { label, children })
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
