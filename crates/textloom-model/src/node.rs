//! The document tree node.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::replace;
use crate::resolved_pos::ResolvedPos;
use crate::schema::{NodeType, Schema};
use crate::slice::Slice;

#[derive(Debug)]
struct NodeData {
    node_type: NodeType,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
    /// Cached char count of `text`; 0 for non-text nodes.
    text_len: usize,
}

/// A node in the document tree: a leaf (text or atom) or a parent with
/// child content. Nodes are immutable and share structure through `Arc`;
/// "modifying" a node always builds a new one.
///
/// Positions count Unicode scalar values: a text node's size is its char
/// count, any other leaf's size is 1, and a parent node spans its content
/// plus two boundary tokens.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    pub(crate) fn new(node_type: NodeType, content: Fragment, marks: Vec<Mark>) -> Node {
        Node(Arc::new(NodeData {
            node_type,
            content,
            marks,
            text: None,
            text_len: 0,
        }))
    }

    pub(crate) fn text_node(node_type: NodeType, text: String, marks: Vec<Mark>) -> Node {
        let text_len = text.chars().count();
        Node(Arc::new(NodeData {
            node_type,
            content: Fragment::empty(),
            marks,
            text: Some(text),
            text_len,
        }))
    }

    pub fn node_type(&self) -> &NodeType {
        &self.0.node_type
    }

    pub fn marks(&self) -> &[Mark] {
        &self.0.marks
    }

    pub fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    pub fn node_size(&self) -> usize {
        if self.0.text.is_some() {
            self.0.text_len
        } else if self.is_leaf() {
            1
        } else {
            self.0.content.size() + 2
        }
    }

    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.0.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.0.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.0.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.0.content.last_child()
    }

    pub fn is_text(&self) -> bool {
        self.0.text.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.node_type.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.0.node_type.is_atom()
    }

    pub fn is_inline(&self) -> bool {
        self.0.node_type.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.0.node_type.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.0.node_type.is_textblock()
    }

    pub fn inline_content(&self) -> bool {
        self.0.node_type.inline_content()
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        match &self.0.text {
            Some(text) => text.clone(),
            None => {
                let mut out = String::new();
                for child in self.0.content.iter() {
                    out.push_str(&child.text_content());
                }
                out
            }
        }
    }

    /// Same type and same mark set.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.node_type() == other.node_type() && Mark::same_set(self.marks(), other.marks())
    }

    /// A node like this one but with different content.
    pub fn copy(&self, content: Fragment) -> Node {
        assert!(!self.is_text(), "text nodes have no content to replace");
        Node::new(self.0.node_type.clone(), content, self.0.marks.clone())
    }

    /// A node like this one but with a different mark set.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        if Mark::same_set(self.marks(), &marks) {
            return self.clone();
        }
        match &self.0.text {
            Some(text) => Node::text_node(self.0.node_type.clone(), text.clone(), marks),
            None => Node(Arc::new(NodeData {
                node_type: self.0.node_type.clone(),
                content: self.0.content.clone(),
                marks,
                text: None,
                text_len: 0,
            })),
        }
    }

    /// A text node like this one but with different text.
    pub fn with_text(&self, text: String) -> Node {
        assert!(self.is_text(), "with_text only applies to text nodes");
        Node::text_node(self.0.node_type.clone(), text, self.0.marks.clone())
    }

    /// Cut a sub-node between two positions relative to this node's
    /// content (for text nodes, char offsets into the text).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if let Some(text) = &self.0.text {
            if from == 0 && to == self.0.text_len {
                return self.clone();
            }
            let cut: String = text.chars().take(to).skip(from).collect();
            return self.with_text(cut);
        }
        if from == 0 && to == self.0.content.size() {
            return self.clone();
        }
        self.copy(self.0.content.cut(from, to))
    }

    /// The slice of this document between two positions, with open depths
    /// recorded so it can be re-inserted elsewhere.
    pub fn slice(&self, from: usize, to: usize) -> Result<Slice, ModelError> {
        if from == to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = rfrom.shared_depth(to);
        let start = rfrom.start(depth);
        let content = rfrom
            .node(depth)
            .content()
            .cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(
            content,
            rfrom.depth() - depth,
            rto.depth() - depth,
        ))
    }

    /// Replace the range between two positions with a slice, joining the
    /// slice's open sides onto the surrounding structure.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ModelError> {
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        replace::replace(&rfrom, &rto, slice)
    }

    /// Resolve a position in this document into a [`ResolvedPos`] with
    /// ancestor lookups at every depth.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, ModelError> {
        ResolvedPos::resolve(self, pos)
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "type".to_string(),
            Value::String(self.node_type().name().to_string()),
        );
        if let Some(text) = self.text() {
            obj.insert("text".to_string(), Value::String(text.to_string()));
        } else if self.child_count() > 0 {
            obj.insert("content".to_string(), self.0.content.to_json());
        }
        if !self.marks().is_empty() {
            obj.insert(
                "marks".to_string(),
                Value::Array(self.marks().iter().map(Mark::to_json).collect()),
            );
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Node, ModelError> {
        let obj = json
            .as_object()
            .ok_or_else(|| ModelError::bad_json("node", "expected an object"))?;
        let name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::bad_json("node", "missing type"))?;
        let node_type = schema.node_type(name)?.clone();
        let marks = match obj.get("marks") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| Mark::from_json(schema, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ModelError::bad_json("node", "marks must be an array")),
            None => Vec::new(),
        };
        if node_type.is_text() {
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| ModelError::bad_json("node", "text node is missing text"))?;
            return Ok(schema.text_with_marks(text, marks));
        }
        let content = match obj.get("content") {
            Some(value) => Fragment::from_json(schema, value)?,
            None => Fragment::empty(),
        };
        node_type.check_content(&content)?;
        Ok(Node::new(node_type, content, marks))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.same_markup(other)
                && self.text() == other.text()
                && self.0.content == other.0.content)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.text() {
            write!(f, "{}({:?})", self.node_type().name(), text)
        } else if self.child_count() == 0 {
            write!(f, "{}", self.node_type().name())
        } else {
            write!(f, "{}(", self.node_type().name())?;
            for (i, child) in self.0.content.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{child:?}")?;
            }
            write!(f, ")")
        }
    }
}
