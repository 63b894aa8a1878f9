//! # Entity Patch Library
//!
//! This library turns a tree of declarative configuration entities into JSON
//! patch operations, split by the external resource that owns each part of
//! the tree. It is used by the `entity-patch` command-line tool but can be
//! embedded in any application that builds entity trees of its own.
//!
//! ## Quick Example
//!
//! ```
//! use entity_patch::model::{Entity, NodeKind, RelationSlot, ResourceId};
//! use entity_patch::serialize;
//!
//! let item = NodeKind::new("Item").into_shared();
//! let root = NodeKind::new("Root")
//!     .with_slot(RelationSlot::many("items", "Item", "name"))
//!     .into_shared();
//!
//! let tree = Entity::builder(root)
//!     .resource("router")
//!     .field("name", "edge")
//!     .child("items", Entity::builder(item).field("name", "a").build().unwrap())
//!     .build()
//!     .unwrap();
//!
//! let ops = serialize::serialize_for_resource(&tree, &ResourceId::new("router")).unwrap();
//! assert_eq!(ops.len(), 2);
//! assert_eq!(ops[0].path, ".");
//! assert_eq!(ops[1].path, "items[name=a]");
//! ```
//!
//! ## Core Concepts
//!
//! - **Model (`model`)**: The [`model::ConfigNode`] capability and the owned
//!   [`model::Entity`] tree, with relation slots classified as anchors or chains.
//! - **Resolution (`resolve`)**: Finds the resource owning a node, inheriting
//!   from the nearest ancestor.
//! - **Paths (`path`)**: Builds `slot[field=value]` path expressions for anchors.
//! - **Serialization (`serialize`)**: Inline and resource-partitioned serializers.
//! - **Patches (`patch`)**: The operation type and a reference applier.
//! - **Schema and models (`schema`, `config`)**: YAML documents declaring node
//!   kinds and the instance trees built from them.

pub mod config;
pub mod error;
pub mod model;
pub mod patch;
pub mod path;
pub mod resolve;
pub mod schema;
pub mod serialize;

#[cfg(test)]
mod serialize_proptest;
