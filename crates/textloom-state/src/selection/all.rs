//! Whole-document selections.

use textloom_model::{Node, ResolvedPos};

/// A selection spanning the entire document, from position 0 to the end
/// of the top node's content.
#[derive(Debug, Clone)]
pub struct AllSelection {
    anchor: ResolvedPos,
    head: ResolvedPos,
}

impl AllSelection {
    pub fn new(doc: &Node) -> AllSelection {
        let anchor = doc.resolve(0).expect("position 0 always resolves");
        let head = doc
            .resolve(doc.content().size())
            .expect("the content end always resolves");
        AllSelection { anchor, head }
    }

    pub fn resolved_anchor(&self) -> &ResolvedPos {
        &self.anchor
    }

    pub fn resolved_head(&self) -> &ResolvedPos {
        &self.head
    }
}
