//! Patch operations and their application to JSON documents.
//!
//! A [`PatchOperation`] says how to combine a value into a document at a path:
//!
//! - `merge` deep-merges objects into the existing node. Keys are added or
//!   overwritten, untouched keys stay, non-object values replace.
//! - `replace` overwrites the node at the path.
//!
//! Paths use the syntax produced by [`crate::path`]: `.` for the root,
//! `/`-separated segments, and `slot[field=value]` to pick the element of a
//! list whose `field` has that value.
//!
//! ## Example
//!
//! ```
//! use entity_patch::model::OperationMode;
//! use entity_patch::patch::{apply_operation, PatchOperation};
//! use serde_json::json;
//!
//! let mut document = json!({"items": [{"name": "a", "size": 1}]});
//! let op = PatchOperation {
//!     operation: OperationMode::Merge,
//!     path: "items[name=a]".to_string(),
//!     value: json!({"color": "red"}),
//! };
//! apply_operation(&mut document, &op).unwrap();
//! assert_eq!(document["items"][0], json!({"name": "a", "size": 1, "color": "red"}));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};
use crate::model::OperationMode;
use crate::path::{render_index_value, PathSegment, ROOT_PATH};

/// One `{operation, path, value}` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub operation: OperationMode,
    pub path: String,
    pub value: JsonValue,
}

/// Parse a path expression into segments.
///
/// `.` and the empty string address the root. A segment of the form
/// `key[field=value]` selects a list element; anything else is an object key.
/// A selector runs from its `[` to the first `]` that ends the segment, i.e.
/// one followed by `/` or the end of the path, so the value may itself hold
/// `/`, `[` or `]`. Only a value containing `]/` cannot be addressed.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let path = path.trim();
    if path.is_empty() || path == ROOT_PATH {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut rest = path;
    loop {
        let end = segment_end(rest);
        segments.push(parse_segment(path, &rest[..end])?);
        match rest[end..].strip_prefix('/') {
            Some(tail) => rest = tail,
            None => break,
        }
    }

    Ok(segments)
}

/// Length of the first segment of `rest`.
fn segment_end(rest: &str) -> usize {
    let slash = rest.find('/').unwrap_or(rest.len());
    let Some(open) = rest[..slash].find('[') else {
        return slash;
    };
    rest[open..]
        .match_indices(']')
        .map(|(offset, _)| open + offset)
        .find(|&close| matches!(rest.as_bytes().get(close + 1).copied(), None | Some(b'/')))
        .map_or(rest.len(), |close| close + 1)
}

fn parse_segment(path: &str, segment: &str) -> Result<PathSegment> {
    let invalid = |message: &str| Error::Patch {
        path: path.to_string(),
        message: format!("{} in segment '{}'", message, segment),
    };

    if segment.is_empty() {
        return Err(invalid("empty segment"));
    }

    let Some(open) = segment.find('[') else {
        return Ok(PathSegment::Key(segment.to_string()));
    };
    let Some(selector) = segment[open + 1..].strip_suffix(']') else {
        return Err(invalid("unterminated selector"));
    };
    let Some((index_field, value)) = selector.split_once('=') else {
        return Err(invalid("selector without '='"));
    };
    if open == 0 || index_field.is_empty() {
        return Err(invalid("incomplete selector"));
    }

    Ok(PathSegment::Select {
        key: segment[..open].to_string(),
        index_field: index_field.to_string(),
        value: value.to_string(),
    })
}

/// Navigate to the node addressed by `path`, creating missing structure.
///
/// Missing keys become empty objects, missing lists become empty lists, and a
/// selector that matches no element appends `{field: value}` to the list.
///
/// # Errors
///
/// Returns `Error::Patch` when the document's shape does not fit the path,
/// e.g. a selector applied to something that is not a list.
pub fn navigate_json_value<'a>(
    value: &'a mut JsonValue,
    path: &[PathSegment],
) -> Result<&'a mut JsonValue> {
    let mut current = value;
    for segment in path {
        let object = as_object(current, segment)?;
        match segment {
            PathSegment::Key(key) => {
                current = object
                    .entry(key.clone())
                    .or_insert(JsonValue::Object(Map::new()));
            }
            PathSegment::Select {
                key,
                index_field,
                value,
            } => {
                let list = object
                    .entry(key.clone())
                    .or_insert(JsonValue::Array(Vec::new()));
                if list.is_null() {
                    *list = JsonValue::Array(Vec::new());
                }
                let JsonValue::Array(items) = list else {
                    return Err(Error::Patch {
                        path: segment.to_string(),
                        message: format!("expected a list under '{}'", key),
                    });
                };

                let is_selected = |item: &JsonValue| {
                    item.get(index_field).map(render_index_value).as_deref() == Some(value.as_str())
                };
                let position = match items.iter().position(is_selected) {
                    Some(position) => position,
                    None => {
                        let mut element = Map::new();
                        element.insert(index_field.clone(), JsonValue::String(value.clone()));
                        items.push(JsonValue::Object(element));
                        items.len() - 1
                    }
                };
                current = &mut items[position];
            }
        }
    }

    Ok(current)
}

fn as_object<'a>(
    value: &'a mut JsonValue,
    segment: &PathSegment,
) -> Result<&'a mut Map<String, JsonValue>> {
    if value.is_null() {
        *value = JsonValue::Object(Map::new());
    }
    match value {
        JsonValue::Object(map) => Ok(map),
        _ => Err(Error::Patch {
            path: segment.to_string(),
            message: format!("expected an object while navigating to '{}'", segment.key()),
        }),
    }
}

/// Recursively merge `source` into `target`.
///
/// - Objects: keys are merged recursively, source values win on conflicts
/// - Anything else: the source replaces the target
pub fn merge_json_values(target: &mut JsonValue, source: &JsonValue) {
    match (target, source) {
        (JsonValue::Object(target_map), JsonValue::Object(source_map)) => {
            for (key, value) in source_map {
                if let Some(existing) = target_map.get_mut(key) {
                    if existing.is_object() && value.is_object() {
                        merge_json_values(existing, value);
                        continue;
                    }
                }
                target_map.insert(key.clone(), value.clone());
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Apply one operation to `document`.
pub fn apply_operation(document: &mut JsonValue, op: &PatchOperation) -> Result<()> {
    let path = parse_path(&op.path)?;
    let target = navigate_json_value(document, &path)?;
    match op.operation {
        OperationMode::Merge => merge_json_values(target, &op.value),
        OperationMode::Replace => *target = op.value.clone(),
    }
    Ok(())
}

/// Apply `operations` to `document` in order.
pub fn apply_operations(document: &mut JsonValue, operations: &[PatchOperation]) -> Result<()> {
    for op in operations {
        apply_operation(document, op)?;
    }
    Ok(())
}

/// Order operations gathered from several resources so that every node is
/// written before the nodes below it.
///
/// A `replace` discards whatever its node held, including anchors written by
/// other resources, so it has to land before them. The sort is stable:
/// operations at the same depth keep their relative order.
pub fn order_parents_first<I>(operations: I) -> Result<Vec<PatchOperation>>
where
    I: IntoIterator<Item = PatchOperation>,
{
    let mut by_depth = operations
        .into_iter()
        .map(|op| Ok((parse_path(&op.path)?.len(), op)))
        .collect::<Result<Vec<_>>>()?;
    by_depth.sort_by_key(|(depth, _)| *depth);
    Ok(by_depth.into_iter().map(|(_, op)| op).collect())
}
