//! Path expressions addressing anchor nodes.
//!
//! The root of a serialization call has the path `.`. Every anchor traversal
//! below it adds one segment: the slot name for single-valued slots, or
//! `slot[indexField=value]` for `many` slots. Chain traversals add nothing,
//! since chain descendants live inside their anchor's value. Segments are
//! joined with `/`.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{Cardinality, ConfigNode, SlotKind};

/// Path of the root anchor.
pub const ROOT_PATH: &str = ".";

/// One segment of a path expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A single-valued slot: `cfg`
    Key(String),
    /// A list element picked by its index field: `items[name=a]`
    Select {
        key: String,
        index_field: String,
        value: String,
    },
}

impl PathSegment {
    pub fn key(&self) -> &str {
        match self {
            PathSegment::Key(key) => key,
            PathSegment::Select { key, .. } => key,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Select {
                key,
                index_field,
                value,
            } => write!(f, "{}[{}={}]", key, index_field, value),
        }
    }
}

/// Render a segment chain as a path string.
pub fn render_path(segments: &[PathSegment]) -> String {
    if segments.is_empty() {
        return ROOT_PATH.to_string();
    }
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// Text form of an index value: strings as-is, anything else as JSON.
pub fn render_index_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// The index value of one child of a `many` slot.
pub fn index_value(slot: &str, index_field: &str, node: &dyn ConfigNode) -> Result<String> {
    node.scalar_fields()
        .get(index_field)
        .map(render_index_value)
        .ok_or_else(|| Error::MissingIndexField {
            slot: slot.to_string(),
            index_field: index_field.to_string(),
        })
}

/// Index values of all children of a `many` slot, in list order.
///
/// Fails when two siblings share a value, since their paths would collide.
pub fn index_values(
    slot: &str,
    index_field: &str,
    children: &[&dyn ConfigNode],
) -> Result<Vec<String>> {
    let mut seen = HashSet::with_capacity(children.len());
    let mut values = Vec::with_capacity(children.len());
    for child in children {
        let value = index_value(slot, index_field, *child)?;
        if !seen.insert(value.clone()) {
            return Err(Error::DuplicateIndex {
                slot: slot.to_string(),
                index_field: index_field.to_string(),
                value,
            });
        }
        values.push(value);
    }
    Ok(values)
}

/// Segments for each child of an anchor slot, in list order.
pub fn child_segments(
    slot_name: &str,
    cardinality: &Cardinality,
    children: &[&dyn ConfigNode],
) -> Result<Vec<PathSegment>> {
    match cardinality {
        Cardinality::Many { index_field } => Ok(index_values(slot_name, index_field, children)?
            .into_iter()
            .map(|value| PathSegment::Select {
                key: slot_name.to_string(),
                index_field: index_field.clone(),
                value,
            })
            .collect()),
        _ => Ok(children
            .iter()
            .map(|_| PathSegment::Key(slot_name.to_string()))
            .collect()),
    }
}

/// Follow `steps` from `root` and return the path of the node reached.
///
/// Each step names a slot and the position of a child in it. Chain steps are
/// followed but add no segment, so the result addresses the nearest anchor.
pub fn path_to(root: &dyn ConfigNode, steps: &[(&str, usize)]) -> Result<String> {
    let mut current = root;
    let mut segments = Vec::new();

    for (slot_name, position) in steps {
        let slot = current
            .relation_slots()
            .iter()
            .find(|slot| slot.name == *slot_name)
            .ok_or_else(|| Error::Schema {
                message: format!(
                    "kind '{}' has no relation named '{}'",
                    current.kind_name(),
                    slot_name
                ),
            })?;
        let children = current.related(slot_name);
        let child = *children.get(*position).ok_or_else(|| Error::Schema {
            message: format!(
                "relation '{}' has {} children, no child at position {}",
                slot_name,
                children.len(),
                position
            ),
        })?;

        let segment = child_segments(slot_name, &slot.cardinality, &children)?.swap_remove(*position);
        if slot.kind == SlotKind::Anchor {
            segments.push(segment);
        }
        current = child;
    }

    Ok(render_path(&segments))
}
