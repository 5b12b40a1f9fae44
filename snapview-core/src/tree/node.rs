//! Data structures for one renderable object-tree node.
//!
//! [`RenderNode`] is an owned, toolkit-agnostic copy of everything a
//! presentation shell needs for one snapshot element.  It is fully `Send`
//! and `Serialize` and holds no reference into the parsed document.

use serde::Serialize;

use crate::properties::PropertyMap;

/// One node of the object tree and its entire subtree.
///
/// `id` is assigned in pre-order starting at 1 and is unique within one
/// render pass.  `raw_xml` is the serialized source fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderNode {
    pub id: u32,
    pub label: String,
    pub properties: PropertyMap,
    pub raw_xml: String,
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    /// Property value by key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &RenderNode> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    /// Number of nodes in this subtree, self included.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }
}
