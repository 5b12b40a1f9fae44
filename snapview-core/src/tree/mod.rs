//! Object-tree rendering for parsed snapshots.
//!
//! [`render_tree`] walks a [`SourceElement`] subtree depth-first and builds
//! one [`RenderNode`] per `element` node, each carrying its label, its
//! flattened property map and its serialized XML fragment.
//!
//! # Id assignment
//!
//! Ids come from a [`RenderContext`] threaded through the recursion.  The
//! current node takes the counter value before its children are visited,
//! so ids are strictly increasing in pre-order and a second pass over the
//! same document yields the same ids.
//!
//! # Child discovery
//!
//! Snapshots come in two shapes: children wrapped in a `children`
//! container, or `element` nodes placed directly under their parent.  If a
//! `children` child exists only its `element` children are used, otherwise
//! the direct `element` children are.  The two sources are never merged.

pub mod node;

use log::debug;
use serde::Serialize;

use node::RenderNode;

use crate::element::SourceElement;
use crate::properties::extract_properties;

/// Tag of the widget nodes that make up the object tree.
pub const ELEMENT_TAG: &str = "element";

/// Tag of the optional wrapper around child widget nodes.
pub const CHILDREN_TAG: &str = "children";

// ---------------------------------------------------------------------------
// Traversal context
// ---------------------------------------------------------------------------

/// Mutable state of one render pass.
#[derive(Debug, Clone)]
pub struct RenderContext {
    next_id: u32,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the current id and advance the counter.
    fn assign_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The id the next rendered node would receive.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }
}

/// Result of a full render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTree {
    pub root: RenderNode,
    /// Counter value after the pass (`node count + 1`).
    pub next_id: u32,
    /// `false` when the document had no `element` node and its root was
    /// rendered instead.
    pub found_element: bool,
}

// ---------------------------------------------------------------------------
// Labels and children
// ---------------------------------------------------------------------------

/// Display label of an element.
///
/// `simplifiedType` wins, optionally followed by `(objectName)`.  Without
/// it the tag name is used, followed by `(objectName)` or else `(class)`.
pub fn node_label(element: &SourceElement) -> String {
    let object_name = element.non_empty_attr("objectName");

    if let Some(simplified) = element.non_empty_attr("simplifiedType") {
        return match object_name {
            Some(name) => format!("{simplified} ({name})"),
            None => simplified.to_owned(),
        };
    }

    match object_name.or_else(|| element.non_empty_attr("class")) {
        Some(suffix) => format!("{} ({suffix})", element.tag),
        None => element.tag.clone(),
    }
}

/// Child widget nodes of an element, in document order.
pub fn child_elements(element: &SourceElement) -> Vec<&SourceElement> {
    match element.child(CHILDREN_TAG) {
        Some(container) => container.children_named(ELEMENT_TAG).collect(),
        None => element.children_named(ELEMENT_TAG).collect(),
    }
}

// ---------------------------------------------------------------------------
// Recursive walker
// ---------------------------------------------------------------------------

fn render_node(element: &SourceElement, ctx: &mut RenderContext) -> RenderNode {
    let id = ctx.assign_id();
    let label = node_label(element);
    let properties = extract_properties(element);
    let raw_xml = element.to_xml_string();

    let children = child_elements(element)
        .into_iter()
        .map(|child| render_node(child, ctx))
        .collect();

    RenderNode {
        id,
        label,
        properties,
        raw_xml,
        children,
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Render `element` and its subtree with a fresh [`RenderContext`].
pub fn render_tree(element: &SourceElement) -> RenderedTree {
    let mut ctx = RenderContext::new();
    let root = render_node(element, &mut ctx);
    RenderedTree {
        root,
        next_id: ctx.next_id(),
        found_element: true,
    }
}

/// Element the object tree starts from: the first `element` below the
/// document root, or `None` if the document has none.
pub fn find_tree_root(document: &SourceElement) -> Option<&SourceElement> {
    document.find_descendant(|e| e.tag == ELEMENT_TAG)
}

/// Render a whole snapshot document.
///
/// Starts at [`find_tree_root`]; documents without any `element` node
/// fall back to rendering the document root itself.
pub fn render_document(document: &SourceElement) -> RenderedTree {
    match find_tree_root(document) {
        Some(start) => {
            let tree = render_tree(start);
            debug!("rendered {} object-tree nodes", tree.next_id - 1);
            tree
        }
        None => {
            debug!("no <{ELEMENT_TAG}> node found, rendering document root");
            RenderedTree {
                found_element: false,
                ..render_tree(document)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
