//! # Model Documents
//!
//! This module reads the instance tree to serialize from a YAML (or JSON)
//! document and builds the immutable [`Entity`] tree against a compiled
//! [`Schema`].
//!
//! ## Format
//!
//! Every node is a mapping with a `kind` and optional `resource`,
//! `operation`, `fields` and `relations`. A relation value is either a single
//! node or a list of nodes:
//!
//! ```yaml
//! kind: Test
//! resource: res_b
//! operation: merge
//! fields: { name: test }
//! relations:
//!   optional: { kind: OptionalEmbeddedTest, fields: { name: optional } }
//!   many:
//!     - { kind: ManyEmbeddedTest, fields: { name: a }, resource: res_a }
//!     - { kind: ManyEmbeddedTest, fields: { name: b } }
//! ```
//!
//! Field values may be strings, numbers, booleans, null or mappings; nested
//! entities belong in `relations`, so lists are rejected as field values.

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{Entity, OperationMode, ResourceId};
use crate::schema::Schema;

/// One node of a model document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDocument {
    /// Name of a kind declared in the schema.
    pub kind: String,
    /// Resource owning this node; inherited from the parent when omitted.
    #[serde(default)]
    pub resource: Option<ResourceId>,
    #[serde(default)]
    pub operation: Option<OperationMode>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub relations: BTreeMap<String, Related>,
}

/// The value of a relation in a model document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Related {
    One(Box<NodeDocument>),
    Many(Vec<NodeDocument>),
}

impl Related {
    fn into_vec(self) -> Vec<NodeDocument> {
        match self {
            Related::One(node) => vec![*node],
            Related::Many(nodes) => nodes,
        }
    }
}

/// Parse a model document and build its entity tree.
pub fn parse(schema: &Schema, source: &str) -> Result<Entity> {
    let document: NodeDocument = serde_yaml::from_str(source).map_err(|err| Error::ConfigParse {
        message: err.to_string(),
        hint: Some("each node needs a 'kind' and may have 'resource', 'operation', 'fields' and 'relations'".to_string()),
    })?;
    build(schema, document)
}

/// Read a model file and build its entity tree.
pub fn from_file(schema: &Schema, path: &Path) -> Result<Entity> {
    let content = std::fs::read_to_string(path)?;
    debug!("loading model from {}", path.display());
    parse(schema, &content)
}

/// Build the entity tree described by `document`.
pub fn build(schema: &Schema, document: NodeDocument) -> Result<Entity> {
    let kind = schema.kind(&document.kind)?;

    if let Some((field, _)) = document.fields.iter().find(|(_, value)| value.is_array()) {
        return Err(Error::ConfigParse {
            message: format!("field '{}.{}' holds a list", document.kind, field),
            hint: Some("declare a relation for nested entities".to_string()),
        });
    }

    let mut builder = Entity::builder(kind).fields(document.fields);
    if let Some(resource) = document.resource {
        builder = builder.resource(resource);
    }
    if let Some(operation) = document.operation {
        builder = builder.operation(operation);
    }
    for (slot, related) in document.relations {
        for child in related.into_vec() {
            builder = builder.child(slot.clone(), build(schema, child)?);
        }
    }
    builder.build()
}
