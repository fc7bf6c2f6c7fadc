//! Immutable document tree for textloom.
//!
//! Documents are trees of [`Node`] values sharing structure through `Arc`;
//! every edit produces a new tree, never mutates one in place. Positions
//! count Unicode scalar values: a text node occupies one position per char,
//! any other leaf occupies one position, and a non-leaf node spans its
//! content plus two boundary tokens.
//!
//! The crate exposes the narrow surface the state layer consumes:
//! [`Node::resolve`] for position-to-structure lookups, [`Node::slice`] and
//! [`Node::replace`] for tree surgery, [`Schema`] for constructing nodes and
//! marks, and schema-directed JSON (de)serialization.

pub mod error;
pub mod fragment;
pub mod mark;
pub mod node;
pub mod resolved_pos;
pub mod schema;
pub mod slice;

mod replace;

pub use error::ModelError;
pub use fragment::Fragment;
pub use mark::{Mark, MarkType};
pub use node::Node;
pub use resolved_pos::ResolvedPos;
pub use schema::{ContentKind, MarkTypeSpec, NodeType, NodeTypeSpec, Schema, SchemaSpec};
pub use slice::Slice;
