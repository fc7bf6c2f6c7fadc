//! Selections between two points in text-bearing content.

use textloom_model::{Node, ResolvedPos};
use textloom_transform::Mapping;

use crate::error::StateError;
use crate::selection::Selection;

/// A classical text selection: both endpoints resolve inside inline
/// content. When anchor and head coincide it is a cursor.
#[derive(Debug, Clone)]
pub struct TextSelection {
    anchor: ResolvedPos,
    head: ResolvedPos,
}

impl TextSelection {
    pub fn new(anchor: ResolvedPos, head: ResolvedPos) -> TextSelection {
        TextSelection { anchor, head }
    }

    /// Resolve a text selection between two positions of a document.
    pub fn create(doc: &Node, anchor: usize, head: usize) -> Result<TextSelection, StateError> {
        Ok(TextSelection {
            anchor: doc.resolve(anchor)?,
            head: doc.resolve(head)?,
        })
    }

    /// A cursor at one position of a document.
    pub fn cursor_at(doc: &Node, pos: usize) -> Result<TextSelection, StateError> {
        let pos = doc.resolve(pos)?;
        Ok(TextSelection {
            anchor: pos.clone(),
            head: pos,
        })
    }

    pub fn resolved_anchor(&self) -> &ResolvedPos {
        &self.anchor
    }

    pub fn resolved_head(&self) -> &ResolvedPos {
        &self.head
    }

    /// The shared endpoint when this selection is a cursor.
    pub fn cursor(&self) -> Option<&ResolvedPos> {
        if self.anchor.pos() == self.head.pos() {
            Some(&self.head)
        } else {
            None
        }
    }

    pub(crate) fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        let head = resolve_mapped(doc, mapping.map(self.head.pos(), 1));
        if !head.parent().inline_content() {
            return Selection::near(&head, 1);
        }
        let anchor = resolve_mapped(doc, mapping.map(self.anchor.pos(), 1));
        let anchor = if anchor.parent().inline_content() {
            anchor
        } else {
            head.clone()
        };
        Selection::Text(TextSelection::new(anchor, head))
    }

    /// A text selection spanning the given positions, moving either
    /// endpoint to the nearest position with inline content when its
    /// container has none. `bias` breaks the tie for a collapsed
    /// selection; otherwise the direction is implied by the endpoints.
    pub fn between(anchor: &ResolvedPos, head: &ResolvedPos, bias: Option<i8>) -> Selection {
        let d_pos = anchor.pos() as isize - head.pos() as isize;
        let bias = match bias {
            Some(bias) if bias != 0 && d_pos == 0 => bias,
            _ => {
                if d_pos >= 0 {
                    1
                } else {
                    -1
                }
            }
        };
        let mut head = head.clone();
        if !head.parent().inline_content() {
            match Selection::find_from(&head, bias, true)
                .or_else(|| Selection::find_from(&head, -bias, true))
            {
                Some(found) => head = found.resolved_head().clone(),
                None => return Selection::near(&head, bias),
            }
        }
        let mut anchor = anchor.clone();
        if !anchor.parent().inline_content() {
            if d_pos == 0 {
                anchor = head.clone();
            } else {
                match Selection::find_from(&anchor, -bias, true)
                    .or_else(|| Selection::find_from(&anchor, bias, true))
                {
                    Some(found) => {
                        anchor = found.resolved_anchor().clone();
                        if (anchor.pos() < head.pos()) != (d_pos < 0) {
                            anchor = head.clone();
                        }
                    }
                    None => return Selection::near(&head, bias),
                }
            }
        }
        Selection::Text(TextSelection::new(anchor, head))
    }
}

pub(crate) fn resolve_mapped(doc: &Node, pos: usize) -> ResolvedPos {
    doc.resolve(pos)
        .expect("mapped position lands inside the document")
}
