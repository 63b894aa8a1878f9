//! # Config Node Model
//!
//! The immutable tree that the serializers walk. A tree is made of nodes that
//! implement [`ConfigNode`]: each node exposes its scalar fields, the relation
//! slots declared by its kind, the children held in each slot, an optional
//! resource binding and an operation mode.
//!
//! ## Relation taxonomy
//!
//! Every slot has a [`Cardinality`] and a [`SlotKind`]:
//!
//! - **Anchor** slots lead to structurally distinct kinds. Their children are
//!   independently addressable and can belong to another resource.
//! - **Chain** slots are self-referential. Their children are always inlined
//!   into the value of the nearest anchor.
//!
//! [`Entity`] is the concrete node type built by the model loader in
//! [`crate::config`]; other node types can take part in serialization by
//! implementing [`ConfigNode`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Identity of the external resource that owns a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How a serialized value is combined with the data already at its path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// Deep-merge the value into the existing node.
    #[default]
    Merge,
    /// Overwrite the existing node with the value.
    Replace,
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationMode::Merge => f.write_str("merge"),
            OperationMode::Replace => f.write_str("replace"),
        }
    }
}

/// How many children a relation slot holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one child.
    SingleRequired,
    /// Zero or one child.
    SingleOptional,
    /// An ordered list of children, told apart by the value of `index_field`.
    Many { index_field: String },
}

impl Cardinality {
    /// Check a child count against this cardinality.
    pub fn check(&self, slot: &str, found: usize) -> Result<()> {
        let expected = match self {
            Cardinality::SingleRequired if found != 1 => "exactly one",
            Cardinality::SingleOptional if found > 1 => "at most one",
            _ => return Ok(()),
        };
        Err(Error::Cardinality {
            slot: slot.to_string(),
            expected: expected.to_string(),
            found,
        })
    }

    pub fn index_field(&self) -> Option<&str> {
        match self {
            Cardinality::Many { index_field } => Some(index_field),
            _ => None,
        }
    }
}

/// Whether a slot's children are addressed on their own or folded into
/// their parent's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Anchor,
    Chain,
}

/// A named relation slot declared by a node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSlot {
    /// Field name the children are serialized under.
    pub name: String,
    /// Name of the kind the children must be (or derive from).
    pub target: String,
    pub cardinality: Cardinality,
    pub kind: SlotKind,
}

impl RelationSlot {
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
        kind: SlotKind,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality,
            kind,
        }
    }

    /// An anchor slot holding exactly one child.
    pub fn required(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, Cardinality::SingleRequired, SlotKind::Anchor)
    }

    /// An anchor slot holding zero or one child.
    pub fn optional(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, Cardinality::SingleOptional, SlotKind::Anchor)
    }

    /// An anchor slot holding a list of children indexed by `index_field`.
    pub fn many(
        name: impl Into<String>,
        target: impl Into<String>,
        index_field: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            target,
            Cardinality::Many {
                index_field: index_field.into(),
            },
            SlotKind::Anchor,
        )
    }

    /// Turn this slot into a chain slot.
    pub fn chain(mut self) -> Self {
        self.kind = SlotKind::Chain;
        self
    }

    pub fn is_anchor(&self) -> bool {
        self.kind == SlotKind::Anchor
    }
}

/// The capability every serializable node type implements.
///
/// Implementations must be `Sync`: serializers for distinct resources may
/// walk the same tree from several threads.
///
/// Cycle detection tells nodes apart by address, size and kind name. Two
/// distinct nodes that agree on all three, such as zero-sized nodes of the
/// same kind, count as the same node.
pub trait ConfigNode: Sync {
    /// Name of the node's kind, used in diagnostics.
    fn kind_name(&self) -> &str;

    fn scalar_fields(&self) -> &Map<String, Value>;

    /// The relation slots of this node, in declaration order.
    fn relation_slots(&self) -> &[RelationSlot];

    /// Children held in the slot named `slot`, in list order.
    fn related(&self, slot: &str) -> Vec<&dyn ConfigNode>;

    fn resource_binding(&self) -> Option<&ResourceId>;

    fn operation_mode(&self) -> OperationMode {
        OperationMode::Merge
    }
}

/// A node kind: its lineage, field defaults and relation slot table.
///
/// Built once, either by hand or by [`crate::schema::Schema`], and shared by
/// every entity of that kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeKind {
    name: String,
    lineage: Vec<String>,
    defaults: Map<String, Value>,
    slots: Vec<RelationSlot>,
}

impl NodeKind {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            lineage: vec![name.clone()],
            name,
            defaults: Map::new(),
            slots: Vec::new(),
        }
    }

    /// Record `parent` as an ancestor of this kind.
    pub fn with_ancestor(mut self, parent: impl Into<String>) -> Self {
        self.lineage.push(parent.into());
        self
    }

    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    pub fn with_slot(mut self, slot: RelationSlot) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this kind is `name` or derives from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.lineage.iter().any(|kind| kind == name)
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub fn slots(&self) -> &[RelationSlot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&RelationSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    pub fn into_shared(self) -> Arc<NodeKind> {
        Arc::new(self)
    }
}

/// The concrete, owned config node.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: Arc<NodeKind>,
    fields: Map<String, Value>,
    relations: BTreeMap<String, Vec<Entity>>,
    resource: Option<ResourceId>,
    operation: OperationMode,
}

impl Entity {
    pub fn builder(kind: Arc<NodeKind>) -> EntityBuilder {
        EntityBuilder {
            kind,
            fields: Map::new(),
            relations: BTreeMap::new(),
            resource: None,
            operation: OperationMode::default(),
        }
    }

    pub fn kind(&self) -> &Arc<NodeKind> {
        &self.kind
    }

    /// Children held in `slot`; empty when the slot is unset or unknown.
    pub fn children(&self, slot: &str) -> &[Entity] {
        self.relations.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl ConfigNode for Entity {
    fn kind_name(&self) -> &str {
        self.kind.name()
    }

    fn scalar_fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn relation_slots(&self) -> &[RelationSlot] {
        self.kind.slots()
    }

    fn related(&self, slot: &str) -> Vec<&dyn ConfigNode> {
        self.children(slot)
            .iter()
            .map(|child| child as &dyn ConfigNode)
            .collect()
    }

    fn resource_binding(&self) -> Option<&ResourceId> {
        self.resource.as_ref()
    }

    fn operation_mode(&self) -> OperationMode {
        self.operation
    }
}

/// Builder for [`Entity`].
///
/// Fields start from the kind's defaults. `build` checks that every relation
/// names a slot of the kind and that each child's kind fits the slot target;
/// cardinalities are checked by the serializers.
#[derive(Debug)]
pub struct EntityBuilder {
    kind: Arc<NodeKind>,
    fields: Map<String, Value>,
    relations: BTreeMap<String, Vec<Entity>>,
    resource: Option<ResourceId>,
    operation: OperationMode,
}

impl EntityBuilder {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn operation(mut self, operation: OperationMode) -> Self {
        self.operation = operation;
        self
    }

    /// Append `child` to the slot named `slot`.
    pub fn child(mut self, slot: impl Into<String>, child: Entity) -> Self {
        self.relations.entry(slot.into()).or_default().push(child);
        self
    }

    pub fn build(self) -> Result<Entity> {
        for (slot_name, children) in &self.relations {
            let slot = self.kind.slot(slot_name).ok_or_else(|| Error::Schema {
                message: format!(
                    "kind '{}' has no relation named '{}'",
                    self.kind.name(),
                    slot_name
                ),
            })?;
            if let Some(child) = children.iter().find(|child| !child.kind.is_a(&slot.target)) {
                return Err(Error::Schema {
                    message: format!(
                        "relation '{}.{}' expects '{}', got '{}'",
                        self.kind.name(),
                        slot_name,
                        slot.target,
                        child.kind.name()
                    ),
                });
            }
        }

        let mut fields = self.kind.defaults().clone();
        fields.extend(self.fields);

        Ok(Entity {
            kind: self.kind,
            fields,
            relations: self.relations,
            resource: self.resource,
            operation: self.operation,
        })
    }
}
