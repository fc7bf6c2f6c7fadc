//! Immutable sequences of sibling nodes.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ModelError;
use crate::node::Node;
use crate::schema::Schema;

/// An immutable sequence of sibling nodes with a cached total size.
#[derive(Clone)]
pub struct Fragment {
    content: Arc<Vec<Node>>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Fragment {
        Fragment {
            content: Arc::new(Vec::new()),
            size: 0,
        }
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Fragment {
        let size = nodes.iter().map(Node::node_size).sum();
        Fragment {
            content: Arc::new(nodes),
            size,
        }
    }

    pub fn from_node(node: Node) -> Fragment {
        Fragment::from_nodes(vec![node])
    }

    /// Total size of the fragment's nodes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child(&self, index: usize) -> &Node {
        &self.content[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.content.iter()
    }

    /// Concatenate two fragments, joining boundary text nodes that carry
    /// the same markup.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.size == 0 {
            return self.clone();
        }
        if self.size == 0 {
            return other.clone();
        }
        let mut nodes: Vec<Node> = self.content.as_ref().clone();
        let mut rest = other.content.iter();
        if let (Some(last), Some(first)) = (nodes.last(), other.content.first())
            && last.is_text()
            && last.same_markup(first)
        {
            let joined = last.with_text(format!(
                "{}{}",
                last.text().unwrap_or(""),
                first.text().unwrap_or("")
            ));
            *nodes.last_mut().unwrap() = joined;
            rest.next();
        }
        nodes.extend(rest.cloned());
        Fragment::from_nodes(nodes)
    }

    /// Cut out the sub-fragment between two positions, cutting into
    /// partially covered children.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to == self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        if to > from {
            let mut pos = 0;
            for child in self.content.iter() {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let mut piece = child.clone();
                    if pos < from || end > to {
                        if piece.is_text() {
                            let start = from.saturating_sub(pos);
                            let stop = (to - pos).min(piece.node_size());
                            piece = piece.cut(start, stop);
                        } else {
                            let start = from.saturating_sub(pos + 1);
                            let stop = (to.saturating_sub(pos + 1)).min(piece.content().size());
                            piece = piece.cut(start, stop);
                        }
                    }
                    result.push(piece);
                }
                pos = end;
            }
        }
        Fragment::from_nodes(result)
    }

    /// Replace the child at `index` with another node.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut nodes = self.content.as_ref().clone();
        nodes[index] = node;
        Fragment::from_nodes(nodes)
    }

    /// Locate the child covering a position within this fragment. Returns
    /// the child index and the position at which that child starts; a
    /// position on a child boundary maps to the index after the boundary.
    pub fn find_index(&self, pos: usize) -> Result<(usize, usize), ModelError> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.content.len(), self.size));
        }
        if pos > self.size {
            return Err(ModelError::PositionOutOfRange(pos));
        }
        let mut cur = 0;
        for (i, child) in self.content.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return Ok((i + 1, end));
                }
                return Ok((i, cur));
            }
            cur = end;
        }
        Err(ModelError::PositionOutOfRange(pos))
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.content.iter().map(Node::to_json).collect())
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Fragment, ModelError> {
        let items = json
            .as_array()
            .ok_or_else(|| ModelError::bad_json("fragment", "expected an array"))?;
        let nodes = items
            .iter()
            .map(|item| Node::from_json(schema, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Fragment::from_nodes(nodes))
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.content, &other.content)
            || (self.size == other.size && *self.content == *other.content)
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for child in self.content.iter() {
            list.entry(child);
        }
        list.finish()
    }
}
