//! Resource resolution.
//!
//! A node belongs to the resource it is bound to, or to the resource of its
//! nearest ancestor when it has no binding of its own.

use crate::error::{Error, Result};
use crate::model::{ConfigNode, ResourceId};

/// Resolve the resource owning `node`.
///
/// `inherited` is the resolved resource of the node's parent, or `None` at the
/// root of a call. A root without a binding cannot be attributed.
pub fn resolve<'a>(
    node: &'a dyn ConfigNode,
    inherited: Option<&'a ResourceId>,
) -> Result<&'a ResourceId> {
    node.resource_binding()
        .or(inherited)
        .ok_or_else(|| Error::UnresolvedResource {
            node: node.kind_name().to_string(),
        })
}
