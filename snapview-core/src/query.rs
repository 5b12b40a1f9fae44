//! Queries over a rendered object tree: lookup by id, label and
//! property search, and document statistics.
//!
//! All functions are pure and operate on owned [`RenderNode`] trees, so
//! presentation shells can call them on every keystroke.

use serde::Serialize;

use crate::element::SourceElement;
use crate::overlay::find_screenshot_base64;
use crate::tree::node::RenderNode;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// One property-search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyHit {
    pub id: u32,
    pub label: String,
    pub key: String,
    pub value: String,
}

/// Size figures for a loaded snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    /// XML elements in the document, root included.
    pub element_count: usize,
    /// Attributes over all XML elements.
    pub attribute_count: usize,
    /// Nodes in the rendered object tree.
    pub node_count: usize,
    /// Depth of the rendered object tree (a lone root is depth 0).
    pub max_depth: usize,
    pub has_screenshot: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Node with the given id.
pub fn find_node(root: &RenderNode, id: u32) -> Option<&RenderNode> {
    root.iter().find(|n| n.id == id)
}

fn collect_visible(node: &RenderNode, term: &str, out: &mut Vec<u32>) {
    let mut below = Vec::new();
    for child in &node.children {
        collect_visible(child, term, &mut below);
    }
    if node.label.to_lowercase().contains(term) || !below.is_empty() {
        out.push(node.id);
        out.extend(below);
    }
}

/// Ids of nodes whose label contains `term` (case-insensitive) together
/// with all of their ancestors, in pre-order.  An empty term keeps every
/// node.
pub fn search_tree(root: &RenderNode, term: &str) -> Vec<u32> {
    let term = term.to_lowercase();
    let mut ids = Vec::new();
    collect_visible(root, &term, &mut ids);
    ids
}

/// Property entries whose key or value contains `term` (case-insensitive),
/// over all nodes in pre-order.
pub fn search_properties(root: &RenderNode, term: &str) -> Vec<PropertyHit> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let needle = needle.as_str();
    root.iter()
        .flat_map(move |node| {
            node.properties
                .iter()
                .filter(move |(k, v)| {
                    k.to_lowercase().contains(needle) || v.to_lowercase().contains(needle)
                })
                .map(move |(k, v)| PropertyHit {
                    id: node.id,
                    label: node.label.clone(),
                    key: k.clone(),
                    value: v.clone(),
                })
        })
        .collect()
}

fn depth(node: &RenderNode) -> usize {
    node.children.iter().map(|c| depth(c) + 1).max().unwrap_or(0)
}

/// Statistics for a document and its rendered tree.
pub fn snapshot_stats(document: &SourceElement, root: &RenderNode) -> SnapshotStats {
    let (element_count, attribute_count) = document
        .descendants()
        .fold((0, 0), |(e, a), el| (e + 1, a + el.attributes.len()));
    SnapshotStats {
        element_count,
        attribute_count,
        node_count: root.node_count(),
        max_depth: depth(root),
        has_screenshot: find_screenshot_base64(document).is_some(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
