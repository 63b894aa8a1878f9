//! # Node Kind Schema
//!
//! Node kinds and their relation slots are declared once, up front, in a
//! schema document. The schema is compiled into one shared [`NodeKind`] per
//! declared kind, which the model loader and the serializers consult as plain
//! data.
//!
//! ## Document format
//!
//! ```yaml
//! kinds:
//!   - name: Test
//!     defaults: { count: 0 }
//!     relations:
//!       - { name: many, target: Item, cardinality: many, index: name }
//!   - name: Item
//!     relations:
//!       - { name: children, target: Item, cardinality: many, index: name }
//! ```
//!
//! ## Compilation rules
//!
//! - A kind inherits the defaults and relations of the kind it `extends`,
//!   its own declarations following the inherited ones.
//! - A relation is a **chain** when its target is the declaring kind or one of
//!   its descendants, and an **anchor** otherwise.
//! - `many` relations need an `index` field; single relations must not have
//!   one.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{Cardinality, NodeKind, RelationSlot, SlotKind};

/// The schema document as written by users.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    /// Declared node kinds, in any order.
    #[serde(default)]
    pub kinds: Vec<KindDef>,
}

/// A node kind declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindDef {
    pub name: String,
    /// Parent kind whose defaults and relations are inherited.
    #[serde(default)]
    pub extends: Option<String>,
    /// Field values applied to entities that do not set them.
    #[serde(default)]
    pub defaults: Map<String, Value>,
    #[serde(default)]
    pub relations: Vec<RelationDef>,
}

/// A relation declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationDef {
    pub name: String,
    /// Kind of the related entities.
    pub target: String,
    pub cardinality: CardinalityDef,
    /// Field that tells siblings apart; required for `many` relations.
    #[serde(default)]
    pub index: Option<String>,
}

/// Relation cardinality as written in a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardinalityDef {
    SingleRequired,
    SingleOptional,
    Many,
}

/// A compiled schema: one shared [`NodeKind`] per declared kind.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    kinds: BTreeMap<String, Arc<NodeKind>>,
}

impl Schema {
    /// Parse and compile a YAML schema document.
    pub fn parse(yaml: &str) -> Result<Self> {
        let document: SchemaDocument = serde_yaml::from_str(yaml)?;
        Self::compile(&document)
    }

    /// Read, parse and compile a schema file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn compile(document: &SchemaDocument) -> Result<Self> {
        let mut defs: BTreeMap<&str, &KindDef> = BTreeMap::new();
        for def in &document.kinds {
            if defs.insert(def.name.as_str(), def).is_some() {
                return Err(schema_error(format!("kind '{}' is declared twice", def.name)));
            }
        }

        let mut kinds = BTreeMap::new();
        for def in &document.kinds {
            let kind = compile_kind(def, &defs)?;
            kinds.insert(def.name.clone(), Arc::new(kind));
        }
        Ok(Self { kinds })
    }

    /// The compiled kind named `name`.
    pub fn kind(&self, name: &str) -> Result<Arc<NodeKind>> {
        self.kinds
            .get(name)
            .cloned()
            .ok_or_else(|| schema_error(format!("unknown kind '{}'", name)))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &Arc<NodeKind>> {
        self.kinds.values()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn schema_error(message: String) -> Error {
    Error::Schema { message }
}

/// `def` followed by its ancestors, nearest first.
fn ancestry<'d>(def: &'d KindDef, defs: &BTreeMap<&str, &'d KindDef>) -> Result<Vec<&'d KindDef>> {
    let mut chain = vec![def];
    let mut seen = HashSet::from([def.name.as_str()]);
    let mut current = def;
    while let Some(parent) = &current.extends {
        let parent_def = *defs.get(parent.as_str()).ok_or_else(|| {
            schema_error(format!("kind '{}' extends unknown kind '{}'", current.name, parent))
        })?;
        if !seen.insert(parent_def.name.as_str()) {
            let names: Vec<&str> = chain.iter().map(|def| def.name.as_str()).collect();
            return Err(schema_error(format!(
                "inheritance cycle: {} -> {}",
                names.join(" -> "),
                parent
            )));
        }
        chain.push(parent_def);
        current = parent_def;
    }
    Ok(chain)
}

fn compile_kind(def: &KindDef, defs: &BTreeMap<&str, &KindDef>) -> Result<NodeKind> {
    let chain = ancestry(def, defs)?;
    let mut kind = NodeKind::new(&def.name);
    for ancestor in chain.iter().skip(1) {
        kind = kind.with_ancestor(&ancestor.name);
    }

    // Root-most ancestor first, so nearer kinds override defaults and append
    // their relations after the inherited ones.
    for declaring in chain.iter().rev() {
        for (field, value) in &declaring.defaults {
            kind = kind.with_default(field.clone(), value.clone());
        }
        for relation in &declaring.relations {
            if kind.slot(&relation.name).is_some() {
                return Err(schema_error(format!(
                    "kind '{}' declares relation '{}' more than once",
                    def.name, relation.name
                )));
            }
            kind = kind.with_slot(compile_relation(declaring, relation, defs)?);
        }
    }
    Ok(kind)
}

fn compile_relation(
    declaring: &KindDef,
    relation: &RelationDef,
    defs: &BTreeMap<&str, &KindDef>,
) -> Result<RelationSlot> {
    let target = defs.get(relation.target.as_str()).ok_or_else(|| {
        schema_error(format!(
            "relation '{}.{}' targets unknown kind '{}'",
            declaring.name, relation.name, relation.target
        ))
    })?;

    let cardinality = match (relation.cardinality, &relation.index) {
        (CardinalityDef::Many, Some(index_field)) => Cardinality::Many {
            index_field: index_field.clone(),
        },
        (CardinalityDef::Many, None) => {
            return Err(schema_error(format!(
                "relation '{}.{}' is many-valued and needs an index field",
                declaring.name, relation.name
            )))
        }
        (_, Some(_)) => {
            return Err(schema_error(format!(
                "relation '{}.{}' is single-valued and cannot have an index field",
                declaring.name, relation.name
            )))
        }
        (CardinalityDef::SingleRequired, None) => Cardinality::SingleRequired,
        (CardinalityDef::SingleOptional, None) => Cardinality::SingleOptional,
    };

    let is_chain = ancestry(target, defs)?
        .iter()
        .any(|kind| kind.name == declaring.name);
    let kind = if is_chain {
        SlotKind::Chain
    } else {
        SlotKind::Anchor
    };

    Ok(RelationSlot::new(
        relation.name.clone(),
        relation.target.clone(),
        cardinality,
        kind,
    ))
}
