//! # Entity Tree Serialization
//!
//! Converts a tree of [`ConfigNode`]s into patch operations.
//!
//! ## Inline serialization
//!
//! [`serialize`] flattens a whole subtree into one nested JSON object. Every
//! relation slot, anchor or chain, is written under its slot name: single
//! slots as a nested object (`null` when an optional slot is empty), `many`
//! slots as a list in child order. Resource boundaries are ignored.
//!
//! ## Resource-partitioned serialization
//!
//! [`serialize_for_resource`] walks the tree depth-first, pre-order, and emits
//! one operation per anchor node whose resolved resource is the requested one.
//! An anchor's value holds its scalar fields plus the inlined content of its
//! non-empty chain slots; anchor children are left out of the value because
//! they are visited on their own, with their own path and resource. The walk
//! continues below anchors that did not match, since deeper anchors may
//! belong to the requested resource again.
//!
//! ## Termination
//!
//! Every walk keeps the identities of the nodes on the current descent. Meeting
//! one of them again is a cycle and fails with [`Error::InfiniteRecursion`];
//! going deeper than [`SerializerOptions::max_depth`] fails with
//! [`Error::DepthExceeded`].

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use rayon::prelude::*;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{Cardinality, ConfigNode, RelationSlot, ResourceId, SlotKind};
use crate::patch::PatchOperation;
use crate::path::{self, PathSegment, ROOT_PATH};
use crate::resolve::resolve;

/// Default limit on the nesting depth of a walk.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Tuning for a [`Serializer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerOptions {
    /// Deepest level a walk may reach; the root is at depth 1.
    pub max_depth: usize,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Entry point for all serialization calls.
///
/// A `Serializer` holds only options; every call allocates its own walk
/// state, so one instance can serve concurrent calls over the same tree.
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    options: SerializerOptions,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SerializerOptions) -> Self {
        Self { options }
    }

    /// Inline the whole subtree below `node` into one value.
    pub fn serialize(&self, node: &dyn ConfigNode) -> Result<Value> {
        Walk::new(&self.options).inline(node)
    }

    /// Serialize the whole tree as a single operation at the root path.
    ///
    /// The root must resolve to a resource, like for every top-level call.
    pub fn serialize_operation(&self, root: &dyn ConfigNode) -> Result<PatchOperation> {
        resolve(root, None)?;
        Ok(PatchOperation {
            operation: root.operation_mode(),
            path: ROOT_PATH.to_string(),
            value: self.serialize(root)?,
        })
    }

    /// Operations for every anchor of the tree owned by `target`, in visit
    /// order.
    ///
    /// The whole tree is walked and validated whatever the target, so a call
    /// fails on an invalid tree even when the faulty part belongs to another
    /// resource.
    pub fn serialize_for_resource(
        &self,
        root: &dyn ConfigNode,
        target: &ResourceId,
    ) -> Result<Vec<PatchOperation>> {
        let operations: Vec<PatchOperation> = Walk::new(&self.options)
            .anchors(root)?
            .into_iter()
            .filter(|anchor| anchor.resource == target)
            .map(|anchor| anchor.operation)
            .collect();
        debug!(
            "serialized {} operation(s) for resource '{}'",
            operations.len(),
            target
        );
        Ok(operations)
    }

    /// Distinct resources owning at least one anchor of the tree, sorted.
    pub fn collect_resources(&self, root: &dyn ConfigNode) -> Result<BTreeSet<ResourceId>> {
        Ok(Walk::new(&self.options)
            .anchors(root)?
            .into_iter()
            .map(|anchor| anchor.resource.clone())
            .collect())
    }

    /// Serialize the tree once per resource it touches, in parallel.
    pub fn serialize_all_resources(
        &self,
        root: &dyn ConfigNode,
    ) -> Result<BTreeMap<ResourceId, Vec<PatchOperation>>> {
        let resources = self.collect_resources(root)?;
        debug!("serializing tree for {} resource(s)", resources.len());
        resources
            .into_par_iter()
            .map(|resource| {
                let operations = self.serialize_for_resource(root, &resource)?;
                Ok::<_, Error>((resource, operations))
            })
            .collect()
    }
}

/// Inline the whole subtree below `node` with default options.
pub fn serialize(node: &dyn ConfigNode) -> Result<Value> {
    Serializer::new().serialize(node)
}

/// Serialize the whole tree as one root operation with default options.
pub fn serialize_operation(root: &dyn ConfigNode) -> Result<PatchOperation> {
    Serializer::new().serialize_operation(root)
}

/// Operations owned by `target`, with default options.
pub fn serialize_for_resource(
    root: &dyn ConfigNode,
    target: &ResourceId,
) -> Result<Vec<PatchOperation>> {
    Serializer::new().serialize_for_resource(root, target)
}

/// Distinct resources of the tree, with default options.
pub fn collect_resources(root: &dyn ConfigNode) -> Result<BTreeSet<ResourceId>> {
    Serializer::new().collect_resources(root)
}

/// Operations for every resource of the tree, with default options.
pub fn serialize_all_resources(
    root: &dyn ConfigNode,
) -> Result<BTreeMap<ResourceId, Vec<PatchOperation>>> {
    Serializer::new().serialize_all_resources(root)
}

/// Identity of a node on the descent: address, size and kind.
///
/// The address alone is ambiguous: a node stored as the first field of
/// another, or a zero-sized node, shares its address with a different node.
#[derive(Debug, PartialEq, Eq)]
struct NodeIdentity {
    address: *const (),
    size: usize,
    kind: String,
}

impl NodeIdentity {
    fn of(node: &dyn ConfigNode) -> Self {
        Self {
            address: node as *const dyn ConfigNode as *const (),
            size: std::mem::size_of_val(node),
            kind: node.kind_name().to_string(),
        }
    }
}

/// State of one walk: the nodes on the current descent.
struct Walk<'o> {
    options: &'o SerializerOptions,
    stack: Vec<NodeIdentity>,
}

impl<'o> Walk<'o> {
    fn new(options: &'o SerializerOptions) -> Self {
        Self {
            options,
            stack: Vec::new(),
        }
    }

    fn enter(&mut self, node: &dyn ConfigNode) -> Result<()> {
        let identity = NodeIdentity::of(node);
        if self.stack.contains(&identity) {
            let mut cycle: Vec<&str> = self.stack.iter().map(|seen| seen.kind.as_str()).collect();
            cycle.push(node.kind_name());
            return Err(Error::InfiniteRecursion {
                path: cycle.join(" -> "),
            });
        }
        if self.stack.len() >= self.options.max_depth {
            return Err(Error::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        self.stack.push(identity);
        Ok(())
    }

    fn leave(&mut self) {
        self.stack.pop();
    }

    fn inline(&mut self, node: &dyn ConfigNode) -> Result<Value> {
        self.enter(node)?;
        let mut object = node.scalar_fields().clone();
        for slot in node.relation_slots() {
            let children = node.related(&slot.name);
            let value = self.inline_slot(slot, &children)?;
            object.insert(slot.name.clone(), value);
        }
        self.leave();
        Ok(Value::Object(object))
    }

    fn inline_slot(&mut self, slot: &RelationSlot, children: &[&dyn ConfigNode]) -> Result<Value> {
        slot.cardinality.check(&slot.name, children.len())?;
        match &slot.cardinality {
            Cardinality::Many { index_field } => {
                path::index_values(&slot.name, index_field, children)?;
                let items = children
                    .iter()
                    .map(|child| self.inline(*child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(items))
            }
            _ => match children.first() {
                Some(child) => self.inline(*child),
                None => Ok(Value::Null),
            },
        }
    }

    /// Scalar fields of an anchor plus its non-empty chain slots, inlined.
    fn anchor_value(&mut self, node: &dyn ConfigNode) -> Result<Value> {
        let mut object: Map<String, Value> = node.scalar_fields().clone();
        for slot in node.relation_slots() {
            if slot.kind != SlotKind::Chain {
                continue;
            }
            let children = node.related(&slot.name);
            if children.is_empty() {
                slot.cardinality.check(&slot.name, 0)?;
                continue;
            }
            let value = self.inline_slot(slot, &children)?;
            object.insert(slot.name.clone(), value);
        }
        Ok(Value::Object(object))
    }

    /// Every anchor of the tree rooted at `root`, in pre-order.
    fn anchors<'a>(&mut self, root: &'a dyn ConfigNode) -> Result<Vec<Anchor<'a>>> {
        let mut anchors = Vec::new();
        self.collect_anchors(root, None, &mut Vec::new(), &mut anchors)?;
        Ok(anchors)
    }

    fn collect_anchors<'a>(
        &mut self,
        node: &'a dyn ConfigNode,
        inherited: Option<&'a ResourceId>,
        segments: &mut Vec<PathSegment>,
        anchors: &mut Vec<Anchor<'a>>,
    ) -> Result<()> {
        self.enter(node)?;
        let resource = resolve(node, inherited)?;
        let operation = PatchOperation {
            operation: node.operation_mode(),
            path: path::render_path(segments),
            value: self.anchor_value(node)?,
        };
        trace!(
            "anchor {} ({}) owned by '{}'",
            operation.path,
            node.kind_name(),
            resource
        );
        anchors.push(Anchor {
            resource,
            operation,
        });

        for slot in node.relation_slots().iter().filter(|slot| slot.is_anchor()) {
            let children = node.related(&slot.name);
            slot.cardinality.check(&slot.name, children.len())?;
            let child_segments = path::child_segments(&slot.name, &slot.cardinality, &children)?;
            for (child, segment) in children.into_iter().zip(child_segments) {
                segments.push(segment);
                self.collect_anchors(child, Some(resource), segments, anchors)?;
                segments.pop();
            }
        }

        self.leave();
        Ok(())
    }
}

/// An anchor reached by a walk, with its resolved owner.
struct Anchor<'a> {
    resource: &'a ResourceId,
    operation: PatchOperation,
}
