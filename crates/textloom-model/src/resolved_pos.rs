//! Positions resolved against a document revision.

use std::fmt;

use crate::error::ModelError;
use crate::mark::Mark;
use crate::node::Node;

#[derive(Clone)]
struct PathEntry {
    node: Node,
    index: usize,
    /// Absolute position at which the child at `index` starts.
    before: usize,
}

/// A position anchored to a specific document revision, carrying the chain
/// of ancestors around it. Depth 0 is the document itself; the deepest
/// entry is the node the position points into.
///
/// The accessors taking a `depth` argument assert `depth <= self.depth()`
/// (and `depth > 0` where a position before the root would be meaningless);
/// violating that is a caller bug, not a recoverable condition.
#[derive(Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos, ModelError> {
        if pos > doc.content().size() {
            return Err(ModelError::PositionOutOfRange(pos));
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let (index, offset) = node.content().find_index(parent_offset)?;
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                before: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            node = child;
            parent_offset = rem - 1;
            start += offset + 1;
        }
        Ok(ResolvedPos {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// The document this position was resolved against.
    pub fn doc(&self) -> &Node {
        &self.path[0].node
    }

    /// The ancestor node at the given depth.
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    /// The index of this position within the ancestor at `depth`.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Like `index`, but counts a position inside (not at the start of) the
    /// node after it as belonging past that node.
    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth() && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// Position at the start of the content of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].before + 1
        }
    }

    /// Position at the end of the content of the ancestor at `depth`.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// Position directly before the ancestor at `depth`.
    pub fn before(&self, depth: usize) -> usize {
        assert!(depth > 0, "there is no position before the root");
        self.path[depth - 1].before
    }

    /// Position directly after the ancestor at `depth`.
    pub fn after(&self, depth: usize) -> usize {
        assert!(depth > 0, "there is no position after the root");
        self.path[depth - 1].before + self.node(depth).node_size()
    }

    /// The node the position points into.
    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    /// Offset of this position into the parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// When the position points into a text node, the offset into that
    /// node's text; 0 when it sits on a node boundary.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.path.len() - 1].before
    }

    /// The node directly after this position, cut when the position is
    /// inside a text node.
    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if index == parent.child_count() {
            return None;
        }
        let d_off = self.text_offset();
        let child = parent.child(index);
        if d_off > 0 {
            Some(child.cut(d_off, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    /// The node directly before this position.
    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let d_off = self.text_offset();
        if d_off > 0 {
            return Some(self.parent().child(index).cut(0, d_off));
        }
        if index == 0 {
            None
        } else {
            Some(self.parent().child(index - 1).clone())
        }
    }

    /// The deepest depth at which this position and `pos` fall inside the
    /// same ancestor's content.
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }

    /// Marks that apply at this position: the marks of the text around it,
    /// preferring the node before when the position sits on a boundary.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content().size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().to_vec();
        }
        let main = if index > 0 {
            parent.maybe_child(index - 1)
        } else {
            None
        };
        match (main, parent.maybe_child(index)) {
            (Some(node), _) | (None, Some(node)) => node.marks().to_vec(),
            (None, None) => Vec::new(),
        }
    }

    /// Marks that should apply to content inserted over the range from this
    /// position to `_end`: the marks of the first inline node of the range,
    /// or `None` when the range does not start with inline content.
    pub fn marks_across(&self, _end: &ResolvedPos) -> Option<Vec<Mark>> {
        let after = self.parent().maybe_child(self.index(self.depth()))?;
        if !after.is_inline() {
            return None;
        }
        Some(after.marks().to_vec())
    }
}

impl fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvedPos({} in {:?})", self.pos, self.parent())
    }
}
