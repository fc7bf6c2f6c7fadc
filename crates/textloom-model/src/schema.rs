//! Declarative node and mark type registry.
//!
//! A [`Schema`] is built once from a [`SchemaSpec`] and shared by reference
//! by every document constructed from it. Node types carry a
//! [`ContentKind`] instead of a full content expression: the kinds are
//! enough for join-compatibility checks during tree surgery, and they do
//! not impose arity, so a document may legally become empty.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::mark::{Mark, MarkType};
use crate::node::Node;

/// What a node type allows as children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    /// No children: text and other leaves.
    None,
    /// Inline children: text and inline atoms.
    Inline,
    /// Block children.
    Block,
}

/// Declaration of one node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTypeSpec {
    pub name: String,
    pub content: ContentKind,
    pub inline: bool,
    pub atom: bool,
    pub selectable: bool,
}

impl NodeTypeSpec {
    /// A block node with the given content kind.
    pub fn block(name: &str, content: ContentKind) -> Self {
        Self {
            name: name.to_string(),
            content,
            inline: false,
            atom: false,
            selectable: true,
        }
    }

    /// The text type. Every schema that contains text declares exactly one,
    /// named `text`.
    pub fn text() -> Self {
        Self {
            name: "text".to_string(),
            content: ContentKind::None,
            inline: true,
            atom: false,
            selectable: false,
        }
    }

    /// A childless atom, inline or block.
    pub fn atom(name: &str, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            content: ContentKind::None,
            inline,
            atom: true,
            selectable: true,
        }
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }
}

/// Declaration of one mark type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkTypeSpec {
    pub name: String,
}

impl MarkTypeSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug)]
struct NodeTypeData {
    spec: NodeTypeSpec,
}

/// A node type, shared by every node of that type.
#[derive(Clone)]
pub struct NodeType(Arc<NodeTypeData>);

impl NodeType {
    fn new(spec: NodeTypeSpec) -> Self {
        NodeType(Arc::new(NodeTypeData { spec }))
    }

    pub fn name(&self) -> &str {
        &self.0.spec.name
    }

    pub fn content_kind(&self) -> ContentKind {
        self.0.spec.content
    }

    pub fn is_text(&self) -> bool {
        self.0.spec.name == "text"
    }

    pub fn is_inline(&self) -> bool {
        self.0.spec.inline
    }

    pub fn is_block(&self) -> bool {
        !self.0.spec.inline
    }

    /// A leaf type has no content slots at all.
    pub fn is_leaf(&self) -> bool {
        self.0.spec.content == ContentKind::None
    }

    /// Atoms are treated as a unit by selection search: leaves, plus any
    /// type explicitly declared atomic.
    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.0.spec.atom
    }

    pub fn inline_content(&self) -> bool {
        self.0.spec.content == ContentKind::Inline
    }

    /// A textblock is a block node with inline content.
    pub fn is_textblock(&self) -> bool {
        !self.0.spec.inline && self.0.spec.content == ContentKind::Inline
    }

    /// Whether a node of this type may be the target of a node selection.
    pub fn selectable(&self) -> bool {
        !self.is_text() && self.0.spec.selectable
    }

    /// Two types can be joined when they accept the same kind of content.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self.content_kind() == other.content_kind()
    }

    fn allows_child(&self, child: &Node) -> bool {
        match self.content_kind() {
            ContentKind::None => false,
            ContentKind::Inline => child.is_inline(),
            ContentKind::Block => child.is_block(),
        }
    }

    /// Check that every node in `content` is a legal child of this type.
    pub fn check_content(&self, content: &Fragment) -> Result<(), ModelError> {
        for child in content.iter() {
            if !self.allows_child(child) {
                return Err(ModelError::InvalidContent(self.name().to_string()));
            }
        }
        Ok(())
    }

    /// Create a node of this type. Not valid for the text type; use
    /// [`Schema::text`] instead.
    pub fn create(&self, content: Fragment, marks: Vec<Mark>) -> Node {
        assert!(!self.is_text(), "text nodes are created through Schema::text");
        Node::new(self.clone(), content, marks)
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.name() == other.name()
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

/// Declaration of a full schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub nodes: Vec<NodeTypeSpec>,
    pub marks: Vec<MarkTypeSpec>,
    /// Name of the top node type; defaults to the first declared node.
    pub top_node: Option<String>,
}

#[derive(Debug)]
struct SchemaData {
    node_types: Vec<NodeType>,
    nodes_by_name: HashMap<String, usize>,
    mark_types: Vec<MarkType>,
    marks_by_name: HashMap<String, usize>,
    top: usize,
    default_textblock: Option<usize>,
}

/// The node and mark vocabulary of a document.
#[derive(Debug, Clone)]
pub struct Schema(Arc<SchemaData>);

impl Schema {
    pub fn new(spec: SchemaSpec) -> Result<Schema, ModelError> {
        let mut node_types = Vec::with_capacity(spec.nodes.len());
        let mut nodes_by_name = HashMap::new();
        for (i, node_spec) in spec.nodes.iter().enumerate() {
            if nodes_by_name
                .insert(node_spec.name.clone(), i)
                .is_some()
            {
                return Err(ModelError::DuplicateTypeName(node_spec.name.clone()));
            }
            node_types.push(NodeType::new(node_spec.clone()));
        }

        let mut mark_types = Vec::with_capacity(spec.marks.len());
        let mut marks_by_name = HashMap::new();
        for (rank, mark_spec) in spec.marks.iter().enumerate() {
            if marks_by_name
                .insert(mark_spec.name.clone(), rank)
                .is_some()
            {
                return Err(ModelError::DuplicateTypeName(mark_spec.name.clone()));
            }
            mark_types.push(MarkType::new(mark_spec.name.clone(), rank));
        }

        let top_name = spec
            .top_node
            .clone()
            .or_else(|| spec.nodes.first().map(|n| n.name.clone()))
            .unwrap_or_else(|| "doc".to_string());
        let top = match nodes_by_name.get(&top_name) {
            Some(&index) => index,
            None => return Err(ModelError::MissingTopNode(top_name)),
        };

        let default_textblock = node_types
            .iter()
            .position(|t| t.is_textblock() && !t.is_text());

        Ok(Schema(Arc::new(SchemaData {
            node_types,
            nodes_by_name,
            mark_types,
            marks_by_name,
            top,
            default_textblock,
        })))
    }

    pub fn top_node_type(&self) -> &NodeType {
        &self.0.node_types[self.0.top]
    }

    pub fn node_type(&self, name: &str) -> Result<&NodeType, ModelError> {
        self.0
            .nodes_by_name
            .get(name)
            .map(|&i| &self.0.node_types[i])
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))
    }

    pub fn mark_type(&self, name: &str) -> Result<&MarkType, ModelError> {
        self.0
            .marks_by_name
            .get(name)
            .map(|&i| &self.0.mark_types[i])
            .ok_or_else(|| ModelError::UnknownMarkType(name.to_string()))
    }

    /// Create a text node.
    pub fn text(&self, text: impl Into<String>) -> Node {
        self.text_with_marks(text, Vec::new())
    }

    pub fn text_with_marks(&self, text: impl Into<String>, marks: Vec<Mark>) -> Node {
        let text_type = self
            .node_type("text")
            .expect("schema declares a text type")
            .clone();
        Node::text_node(text_type, text.into(), marks)
    }

    /// Create a node of the named type with the given children, checking
    /// that the children are legal for that type.
    pub fn node(
        &self,
        name: &str,
        children: Vec<Node>,
        marks: Vec<Mark>,
    ) -> Result<Node, ModelError> {
        let node_type = self.node_type(name)?.clone();
        let content = Fragment::from_nodes(children);
        node_type.check_content(&content)?;
        Ok(node_type.create(content, marks))
    }

    /// Create a mark of the named type.
    pub fn mark(&self, name: &str) -> Result<Mark, ModelError> {
        Ok(self.mark_type(name)?.create())
    }

    pub fn mark_with_attrs(
        &self,
        name: &str,
        attrs: Map<String, Value>,
    ) -> Result<Mark, ModelError> {
        Ok(self.mark_type(name)?.create_with_attrs(attrs))
    }

    /// The empty document: the top node filled with one empty instance of
    /// the schema's first textblock type when the top node holds blocks.
    pub fn empty_document(&self) -> Node {
        let top = self.top_node_type();
        let content = match (top.content_kind(), self.0.default_textblock) {
            (ContentKind::Block, Some(i)) => {
                let block = self.0.node_types[i].create(Fragment::empty(), Vec::new());
                Fragment::from_node(block)
            }
            _ => Fragment::empty(),
        };
        top.create(content, Vec::new())
    }
}
