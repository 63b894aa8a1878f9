//! Property-based tests for the serializers.
//!
//! These tests use proptest to generate random entity trees and verify that
//! the partitioning invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use proptest::prelude::*;
    use serde_json::Value;

    use crate::model::{ConfigNode, Entity, NodeKind, OperationMode, RelationSlot, ResourceId};
    use crate::patch::{apply_operations, order_parents_first, parse_path};
    use crate::serialize::{
        collect_resources, serialize, serialize_all_resources, serialize_for_resource,
    };

    const RESOURCES: [&str; 3] = ["alpha", "beta", "gamma"];

    /// Shape of one generated `items` child.
    #[derive(Debug, Clone)]
    struct ItemShape {
        resource: Option<usize>,
        operation: OperationMode,
        weight: i64,
        nested: usize,
        cfg: Option<(Option<usize>, OperationMode)>,
    }

    /// Shape of the generated root.
    #[derive(Debug, Clone)]
    struct RootShape {
        resource: usize,
        operation: OperationMode,
    }

    fn operation_mode() -> impl Strategy<Value = OperationMode> {
        prop_oneof![Just(OperationMode::Merge), Just(OperationMode::Replace)]
    }

    fn item_shape() -> impl Strategy<Value = ItemShape> {
        (
            prop::option::of(0..RESOURCES.len()),
            operation_mode(),
            any::<i64>(),
            0usize..3,
            prop::option::of((prop::option::of(0..RESOURCES.len()), operation_mode())),
        )
            .prop_map(|(resource, operation, weight, nested, cfg)| ItemShape {
                resource,
                operation,
                weight,
                nested,
                cfg,
            })
    }

    fn tree_shape() -> impl Strategy<Value = (RootShape, Vec<ItemShape>)> {
        (
            (0..RESOURCES.len(), operation_mode())
                .prop_map(|(resource, operation)| RootShape { resource, operation }),
            prop::collection::vec(item_shape(), 0..6),
        )
    }

    struct Kinds {
        root: Arc<NodeKind>,
        item: Arc<NodeKind>,
        cfg: Arc<NodeKind>,
    }

    fn kinds() -> Kinds {
        Kinds {
            root: NodeKind::new("Root")
                .with_slot(RelationSlot::many("items", "Item", "name"))
                .into_shared(),
            item: NodeKind::new("Item")
                .with_slot(RelationSlot::many("nested", "Item", "name").chain())
                .with_slot(RelationSlot::optional("cfg", "Cfg"))
                .into_shared(),
            cfg: NodeKind::new("Cfg").into_shared(),
        }
    }

    fn build_tree(root_shape: &RootShape, items: &[ItemShape]) -> Entity {
        let kinds = kinds();
        let mut root = Entity::builder(kinds.root.clone())
            .resource(RESOURCES[root_shape.resource])
            .operation(root_shape.operation)
            .field("name", "root");

        for (position, shape) in items.iter().enumerate() {
            let mut item = Entity::builder(kinds.item.clone())
                .field("name", format!("item{}", position))
                .field("weight", shape.weight)
                .operation(shape.operation);
            if let Some(resource) = shape.resource {
                item = item.resource(RESOURCES[resource]);
            }
            for nested in 0..shape.nested {
                let child = Entity::builder(kinds.item.clone())
                    .field("name", format!("nested{}", nested))
                    .build()
                    .unwrap();
                item = item.child("nested", child);
            }
            if let Some((cfg_resource, cfg_operation)) = shape.cfg {
                let mut cfg = Entity::builder(kinds.cfg.clone())
                    .field("port", position as i64)
                    .operation(cfg_operation);
                if let Some(resource) = cfg_resource {
                    cfg = cfg.resource(RESOURCES[resource]);
                }
                item = item.child("cfg", cfg.build().unwrap());
            }
            root = root.child("items", item.build().unwrap());
        }

        root.build().unwrap()
    }

    /// Drop `null` values and empty lists, recursively.
    fn strip_empty(value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(_, v)| !v.is_null() && v.as_array().map_or(true, |a| !a.is_empty()))
                    .map(|(k, v)| (k.clone(), strip_empty(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(strip_empty).collect()),
            other => other.clone(),
        }
    }

    /// Order `items` by name; operations at the same depth keep their
    /// resource order, so list elements are created in that order.
    fn sort_items(mut document: Value) -> Value {
        if let Some(Value::Array(items)) = document.get_mut("items") {
            items.sort_by_key(|item| item["name"].as_str().unwrap_or_default().to_string());
        }
        document
    }

    proptest! {
        /// Property: serializing the same tree twice gives identical output
        #[test]
        fn partition_is_deterministic((root, items) in tree_shape()) {
            let tree = build_tree(&root, &items);
            for resource in RESOURCES {
                let id = ResourceId::new(resource);
                let first = serialize_for_resource(&tree, &id).unwrap();
                let second = serialize_for_resource(&tree, &id).unwrap();
                prop_assert_eq!(first, second);
            }
        }

        /// Property: every emitted path parses and no path repeats across resources
        #[test]
        fn paths_are_well_formed_and_unique((root, items) in tree_shape()) {
            let tree = build_tree(&root, &items);
            let mut seen = HashSet::new();
            for resource in RESOURCES {
                for op in serialize_for_resource(&tree, &ResourceId::new(resource)).unwrap() {
                    prop_assert!(parse_path(&op.path).is_ok(), "unparseable path {}", op.path);
                    prop_assert!(seen.insert(op.path.clone()), "duplicate path {}", op.path);
                }
            }
            let cfgs = items.iter().filter(|item| item.cfg.is_some()).count();
            prop_assert_eq!(seen.len(), 1 + items.len() + cfgs);
        }

        /// Property: a resource not bound anywhere in the tree gets no operations
        #[test]
        fn unknown_resource_gets_nothing((root, items) in tree_shape()) {
            let tree = build_tree(&root, &items);
            let ops = serialize_for_resource(&tree, &ResourceId::new("nowhere")).unwrap();
            prop_assert!(ops.is_empty());
            prop_assert!(!collect_resources(&tree).unwrap().contains(&ResourceId::new("nowhere")));
        }

        /// Property: an anchor's value is its inline form without anchor slots
        #[test]
        fn anchor_value_matches_inline_form((root, items) in tree_shape()) {
            let tree = build_tree(&root, &items);
            let all = serialize_all_resources(&tree).unwrap();
            let by_path: Vec<_> = all.values().flatten().collect();

            for (position, item) in tree.related("items").into_iter().enumerate() {
                let path = format!("items[name=item{}]", position);
                let op = by_path.iter().find(|op| op.path == path).unwrap();
                let mut expected = serialize(item).unwrap();
                expected.as_object_mut().unwrap().remove("cfg");
                if items[position].nested == 0 {
                    expected.as_object_mut().unwrap().remove("nested");
                }
                prop_assert_eq!(&op.value, &expected);
            }
        }

        /// Property: applying every resource's operations, parents first, to an
        /// empty document rebuilds the inline serialization, minus empty slots
        #[test]
        fn applied_operations_rebuild_tree((root, items) in tree_shape()) {
            let tree = build_tree(&root, &items);
            let all = serialize_all_resources(&tree).unwrap();
            let ops = order_parents_first(all.into_values().flatten()).unwrap();
            let mut document = Value::Object(Default::default());
            apply_operations(&mut document, &ops).unwrap();
            prop_assert_eq!(
                strip_empty(&sort_items(document)),
                strip_empty(&serialize(&tree).unwrap())
            );
        }
    }
}
