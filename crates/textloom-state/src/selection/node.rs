//! Whole-node selections.

use textloom_model::{Node, ResolvedPos};
use textloom_transform::Mapping;

use crate::error::StateError;
use crate::selection::Selection;
use crate::selection::text::resolve_mapped;

/// A selection covering exactly one selectable node. The node is captured
/// at construction; `to` is always `from + node.node_size()`. Node
/// selections are not rendered as native selection highlights.
#[derive(Debug, Clone)]
pub struct NodeSelection {
    anchor: ResolvedPos,
    head: ResolvedPos,
    node: Node,
}

impl NodeSelection {
    /// Select the node directly after `pos`. Fails when there is none or
    /// it is not selectable.
    pub fn create(doc: &Node, pos: usize) -> Result<NodeSelection, StateError> {
        let anchor = doc.resolve(pos)?;
        let node = anchor
            .node_after()
            .filter(|node| NodeSelection::is_selectable(node))
            .ok_or(StateError::NoNodeAt(pos))?;
        let head = doc.resolve(pos + node.node_size())?;
        Ok(NodeSelection { anchor, head, node })
    }

    /// Whether a node may be the target of a node selection.
    pub fn is_selectable(node: &Node) -> bool {
        !node.is_text() && node.node_type().selectable()
    }

    pub fn resolved_anchor(&self) -> &ResolvedPos {
        &self.anchor
    }

    pub fn resolved_head(&self) -> &ResolvedPos {
        &self.head
    }

    /// The selected node.
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub(crate) fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        let result = mapping.map_result(self.anchor.pos(), 1);
        let pos = resolve_mapped(doc, result.pos);
        if result.deleted {
            return Selection::near(&pos, 1);
        }
        match NodeSelection::create(doc, pos.pos()) {
            Ok(sel) => Selection::Node(sel),
            Err(_) => Selection::near(&pos, 1),
        }
    }
}
