//! Document-independent selection stand-ins.
//!
//! A bookmark survives without a document: it can be mapped through edit
//! mappings while detached and resolved back into a concrete selection
//! later (an undo history does exactly this). Resolution is total — when
//! the bookmarked position no longer supports the original variant, it
//! falls back to a nearby text selection or to selecting everything.

use std::fmt;
use std::sync::Arc;

use textloom_model::Node;
use textloom_transform::Mapping;

use crate::selection::node::NodeSelection;
use crate::selection::text::TextSelection;
use crate::selection::{AllSelection, Selection};

/// Behavior of a custom bookmark variant.
pub trait BookmarkDelegate: fmt::Debug + Send + Sync {
    fn map(&self, mapping: &Mapping) -> SelectionBookmark;
    fn resolve(&self, doc: &Node) -> Selection;
}

/// A document-independent companion to a [`Selection`].
#[derive(Debug, Clone)]
pub enum SelectionBookmark {
    Text { anchor: usize, head: usize },
    Node { anchor: usize },
    All,
    Custom(Arc<dyn BookmarkDelegate>),
}

impl SelectionBookmark {
    /// Map this bookmark through an edit mapping, without a document. A
    /// node bookmark whose node was deleted degrades to a text bookmark.
    pub fn map(&self, mapping: &Mapping) -> SelectionBookmark {
        match self {
            SelectionBookmark::Text { anchor, head } => SelectionBookmark::Text {
                anchor: mapping.map(*anchor, 1),
                head: mapping.map(*head, 1),
            },
            SelectionBookmark::Node { anchor } => {
                let result = mapping.map_result(*anchor, 1);
                if result.deleted {
                    SelectionBookmark::Text {
                        anchor: result.pos,
                        head: result.pos,
                    }
                } else {
                    SelectionBookmark::Node { anchor: result.pos }
                }
            }
            SelectionBookmark::All => SelectionBookmark::All,
            SelectionBookmark::Custom(delegate) => delegate.map(mapping),
        }
    }

    /// Resolve this bookmark against a document. Positions are clamped to
    /// the document, and a variant that no longer fits its position falls
    /// back to the nearest valid selection.
    pub fn resolve(&self, doc: &Node) -> Selection {
        let size = doc.content().size();
        match self {
            SelectionBookmark::Text { anchor, head } => {
                let anchor = doc
                    .resolve((*anchor).min(size))
                    .expect("clamped position resolves");
                let head = doc
                    .resolve((*head).min(size))
                    .expect("clamped position resolves");
                TextSelection::between(&anchor, &head, None)
            }
            SelectionBookmark::Node { anchor } => {
                let pos = doc
                    .resolve((*anchor).min(size))
                    .expect("clamped position resolves");
                match NodeSelection::create(doc, pos.pos()) {
                    Ok(sel) => Selection::Node(sel),
                    Err(_) => Selection::near(&pos, 1),
                }
            }
            SelectionBookmark::All => Selection::All(AllSelection::new(doc)),
            SelectionBookmark::Custom(delegate) => delegate.resolve(doc),
        }
    }
}
