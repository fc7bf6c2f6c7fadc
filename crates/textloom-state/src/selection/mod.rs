//! Selections: what part of the document is selected, and how that
//! survives edits.
//!
//! The built-in variants form a closed enum — [`TextSelection`],
//! [`NodeSelection`], [`AllSelection`] — while custom variants plug in
//! through [`CustomSelection`] and an id-keyed JSON registry
//! ([`register_selection_variant`]).
//!
//! A selection holds resolved anchor/head positions plus a non-empty range
//! list; the first range is authoritative (`from`/`to` always refer to
//! it). The search functions at the bottom re-derive a valid selection
//! near an arbitrary position after the document changed under it;
//! [`Selection::near`] never fails, falling back to selecting the whole
//! document.

mod all;
mod bookmark;
mod custom;
mod node;
mod text;

pub use all::AllSelection;
pub use bookmark::{BookmarkDelegate, SelectionBookmark};
pub use custom::{CustomSelection, SelectionDecoder, SelectionDelegate, register_selection_variant};
pub use node::NodeSelection;
pub use text::TextSelection;

use serde_json::Value;
use textloom_model::{Node, ResolvedPos, Slice};
use textloom_transform::{Mapping, Step};

use crate::error::StateError;
use crate::transaction::Transaction;

/// One selected range, ordered so `from.pos() <= to.pos()`.
#[derive(Debug, Clone)]
pub struct SelectionRange {
    from: ResolvedPos,
    to: ResolvedPos,
}

impl SelectionRange {
    pub fn new(a: ResolvedPos, b: ResolvedPos) -> SelectionRange {
        if a.pos() <= b.pos() {
            SelectionRange { from: a, to: b }
        } else {
            SelectionRange { from: b, to: a }
        }
    }

    pub fn from(&self) -> &ResolvedPos {
        &self.from
    }

    pub fn to(&self) -> &ResolvedPos {
        &self.to
    }
}

/// A selection in a document.
#[derive(Debug, Clone)]
pub enum Selection {
    Text(TextSelection),
    Node(NodeSelection),
    All(AllSelection),
    Custom(CustomSelection),
}

impl Selection {
    /// The immobile side of the selection.
    pub fn resolved_anchor(&self) -> &ResolvedPos {
        match self {
            Selection::Text(sel) => sel.resolved_anchor(),
            Selection::Node(sel) => sel.resolved_anchor(),
            Selection::All(sel) => sel.resolved_anchor(),
            Selection::Custom(sel) => sel.resolved_anchor(),
        }
    }

    /// The moving side of the selection.
    pub fn resolved_head(&self) -> &ResolvedPos {
        match self {
            Selection::Text(sel) => sel.resolved_head(),
            Selection::Node(sel) => sel.resolved_head(),
            Selection::All(sel) => sel.resolved_head(),
            Selection::Custom(sel) => sel.resolved_head(),
        }
    }

    pub fn anchor(&self) -> usize {
        self.resolved_anchor().pos()
    }

    pub fn head(&self) -> usize {
        self.resolved_head().pos()
    }

    /// The ranges covered by this selection. Never empty; the first range
    /// spans `min(anchor, head)..max(anchor, head)` unless a custom
    /// variant supplied explicit ranges.
    pub fn ranges(&self) -> Vec<SelectionRange> {
        if let Selection::Custom(sel) = self
            && let Some(ranges) = sel.explicit_ranges()
        {
            return ranges.to_vec();
        }
        vec![SelectionRange::new(
            self.resolved_anchor().clone(),
            self.resolved_head().clone(),
        )]
    }

    /// The lower end of the first range.
    pub fn resolved_from(&self) -> &ResolvedPos {
        if let Selection::Custom(sel) = self
            && let Some(ranges) = sel.explicit_ranges()
        {
            return ranges[0].from();
        }
        if self.anchor() <= self.head() {
            self.resolved_anchor()
        } else {
            self.resolved_head()
        }
    }

    /// The upper end of the first range.
    pub fn resolved_to(&self) -> &ResolvedPos {
        if let Selection::Custom(sel) = self
            && let Some(ranges) = sel.explicit_ranges()
        {
            return ranges[0].to();
        }
        if self.anchor() <= self.head() {
            self.resolved_head()
        } else {
            self.resolved_anchor()
        }
    }

    pub fn from(&self) -> usize {
        self.resolved_from().pos()
    }

    pub fn to(&self) -> usize {
        self.resolved_to().pos()
    }

    pub fn empty(&self) -> bool {
        self.from() == self.to()
    }

    /// When this is a text selection with both endpoints at the same
    /// position, that position.
    pub fn text_cursor(&self) -> Option<&ResolvedPos> {
        match self {
            Selection::Text(sel) => sel.cursor(),
            _ => None,
        }
    }

    /// Whether the (external) view should render the native selection
    /// highlight for this selection.
    pub fn visible(&self) -> bool {
        match self {
            Selection::Node(_) => false,
            Selection::Custom(sel) => sel.delegate().visible(),
            _ => true,
        }
    }

    /// Re-derive this selection against the document produced by a
    /// mapping. Endpoints that no longer land in valid spots degrade to
    /// the nearest valid selection.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        match self {
            Selection::Text(sel) => sel.map(doc, mapping),
            Selection::Node(sel) => sel.map(doc, mapping),
            Selection::All(_) => Selection::All(AllSelection::new(doc)),
            Selection::Custom(sel) => sel.delegate().map(doc, mapping, sel),
        }
    }

    /// A document-independent stand-in for this selection, mappable
    /// without a document and resolvable later.
    pub fn get_bookmark(&self) -> SelectionBookmark {
        match self {
            Selection::Text(sel) => SelectionBookmark::Text {
                anchor: sel.resolved_anchor().pos(),
                head: sel.resolved_head().pos(),
            },
            Selection::Node(sel) => SelectionBookmark::Node {
                anchor: sel.resolved_anchor().pos(),
            },
            Selection::All(_) => SelectionBookmark::All,
            Selection::Custom(sel) => sel.delegate().bookmark(sel),
        }
    }

    /// Replace the selected ranges in a transaction. Only the first range
    /// receives the content; later ranges are cleared. Afterwards the
    /// transaction's selection sits at the end of the inserted content,
    /// biased backward when the insertion ends in inline content.
    pub fn replace(&self, tr: &mut Transaction, content: Slice) -> Result<(), StateError> {
        // walk down the open end to find what the insertion ends with
        let mut last_node = content.content().last_child().cloned();
        let mut last_parent = None;
        for _ in 0..content.open_end() {
            let node = last_node.expect("open depth points at an existing child");
            last_parent = Some(node.clone());
            last_node = node.last_child().cloned();
        }
        let bias = if match &last_node {
            Some(node) => node.is_inline(),
            None => last_parent.as_ref().is_some_and(Node::is_textblock),
        } {
            -1
        } else {
            1
        };

        let map_from = tr.steps().len();
        let ranges = self.ranges();
        for (i, range) in ranges.iter().enumerate() {
            let mapping = tr.mapping().slice_from(map_from);
            let from = mapping.map(range.from().pos(), 1);
            let to = mapping.map(range.to().pos(), 1);
            if i == 0 {
                tr.replace(from, to, content.clone())?;
                selection_to_insertion_end(tr, map_from, bias)?;
            } else {
                tr.replace(from, to, Slice::empty())?;
            }
        }
        Ok(())
    }

    /// Replace the first range with a single node and delete the others.
    pub fn replace_with(&self, tr: &mut Transaction, node: Node) -> Result<(), StateError> {
        let bias = if node.is_inline() { -1 } else { 1 };
        let map_from = tr.steps().len();
        let ranges = self.ranges();
        for (i, range) in ranges.iter().enumerate() {
            let mapping = tr.mapping().slice_from(map_from);
            let from = mapping.map(range.from().pos(), 1);
            let to = mapping.map(range.to().pos(), 1);
            if i == 0 {
                tr.replace_with(from, to, node.clone())?;
                selection_to_insertion_end(tr, map_from, bias)?;
            } else {
                tr.delete(from, to)?;
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        match self {
            Selection::Text(sel) => serde_json::json!({
                "type": "text",
                "anchor": sel.resolved_anchor().pos(),
                "head": sel.resolved_head().pos(),
            }),
            Selection::Node(sel) => serde_json::json!({
                "type": "node",
                "anchor": sel.resolved_anchor().pos(),
            }),
            Selection::All(_) => serde_json::json!({ "type": "all" }),
            Selection::Custom(sel) => sel.delegate().to_json(sel),
        }
    }

    pub fn from_json(doc: &Node, json: &Value) -> Result<Selection, StateError> {
        let obj = json
            .as_object()
            .ok_or_else(|| StateError::bad_json("selection", "expected an object"))?;
        let variant = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| StateError::bad_json("selection", "missing type"))?;
        let pos_field = |name: &'static str| -> Result<usize, StateError> {
            obj.get(name)
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .ok_or_else(|| StateError::bad_json("selection", name))
        };
        match variant {
            "text" => {
                let anchor = doc.resolve(pos_field("anchor")?)?;
                let head = doc.resolve(pos_field("head")?)?;
                Ok(Selection::Text(TextSelection::new(anchor, head)))
            }
            "node" => Ok(Selection::Node(NodeSelection::create(
                doc,
                pos_field("anchor")?,
            )?)),
            "all" => Ok(Selection::All(AllSelection::new(doc))),
            other => match custom::decoder(other) {
                Some(decode) => decode(doc, json),
                None => Err(StateError::UnknownSelectionType(other.to_string())),
            },
        }
    }

    /// Find a valid selection from a position, trying `dir` first. With
    /// `text_only`, atoms are skipped and only cursor positions count.
    pub fn find_from(pos: &ResolvedPos, dir: i8, text_only: bool) -> Option<Selection> {
        let inner = if pos.parent().inline_content() {
            Some(Selection::Text(TextSelection::new(pos.clone(), pos.clone())))
        } else {
            find_selection_in(
                pos.doc(),
                pos.parent(),
                pos.pos(),
                pos.index(pos.depth()),
                dir,
                text_only,
            )
        };
        if inner.is_some() {
            return inner;
        }
        for depth in (0..pos.depth()).rev() {
            let found = if dir < 0 {
                find_selection_in(
                    pos.doc(),
                    pos.node(depth),
                    pos.before(depth + 1),
                    pos.index(depth),
                    dir,
                    text_only,
                )
            } else {
                find_selection_in(
                    pos.doc(),
                    pos.node(depth),
                    pos.after(depth + 1),
                    pos.index(depth) + 1,
                    dir,
                    text_only,
                )
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// The valid selection nearest to a position. Never fails: when no
    /// cursor or selectable node exists in either direction, selects the
    /// whole document.
    pub fn near(pos: &ResolvedPos, bias: i8) -> Selection {
        Selection::find_from(pos, bias, false)
            .or_else(|| Selection::find_from(pos, -bias, false))
            .unwrap_or_else(|| Selection::All(AllSelection::new(pos.doc())))
    }

    /// The valid selection closest to the start of the document.
    pub fn at_start(doc: &Node) -> Selection {
        find_selection_in(doc, doc, 0, 0, 1, false)
            .unwrap_or_else(|| Selection::All(AllSelection::new(doc)))
    }

    /// The valid selection closest to the end of the document.
    pub fn at_end(doc: &Node) -> Selection {
        find_selection_in(doc, doc, doc.content().size(), doc.child_count(), -1, false)
            .unwrap_or_else(|| Selection::All(AllSelection::new(doc)))
    }
}

impl PartialEq for Selection {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Selection::Text(a), Selection::Text(b)) => {
                a.resolved_anchor().pos() == b.resolved_anchor().pos()
                    && a.resolved_head().pos() == b.resolved_head().pos()
            }
            (Selection::Node(a), Selection::Node(b)) => {
                a.resolved_anchor().pos() == b.resolved_anchor().pos()
            }
            (Selection::All(_), Selection::All(_)) => true,
            (Selection::Custom(a), _) => a.delegate().eq(a, other),
            (_, Selection::Custom(b)) => b.delegate().eq(b, self),
            _ => false,
        }
    }
}

/// After a replace, position the transaction's selection at the end of
/// the content the last replace step inserted.
fn selection_to_insertion_end(
    tr: &mut Transaction,
    start_len: usize,
    bias: i8,
) -> Result<(), StateError> {
    let steps = tr.steps();
    if steps.len() <= start_len {
        return Ok(());
    }
    let last = steps.len() - 1;
    if !matches!(steps[last], Step::Replace(_)) {
        return Ok(());
    }
    let mut end = None;
    tr.mapping().maps()[last].for_each(|_old_from, _old_to, _new_from, new_to| {
        if end.is_none() {
            end = Some(new_to);
        }
    });
    if let Some(end) = end {
        let pos = tr.doc().resolve(end)?;
        let selection = Selection::near(&pos, bias);
        tr.set_selection(selection)?;
    }
    Ok(())
}

/// Recursive tree search for a valid cursor or selectable node starting at
/// `(node, index)` and stepping by `dir`.
fn find_selection_in(
    doc: &Node,
    node: &Node,
    pos: usize,
    index: usize,
    dir: i8,
    text_only: bool,
) -> Option<Selection> {
    if node.inline_content() {
        let cursor = doc.resolve(pos).ok()?;
        return Some(Selection::Text(TextSelection::new(cursor.clone(), cursor)));
    }
    let mut i = index as isize - if dir > 0 { 0 } else { 1 };
    let mut pos = pos as isize;
    loop {
        let in_range = if dir > 0 {
            i < node.child_count() as isize
        } else {
            i >= 0
        };
        if !in_range {
            return None;
        }
        let child = node.child(i as usize);
        if !child.is_atom() {
            let inner = find_selection_in(
                doc,
                child,
                (pos + dir as isize) as usize,
                if dir < 0 { child.child_count() } else { 0 },
                dir,
                text_only,
            );
            if inner.is_some() {
                return inner;
            }
        } else if !text_only && NodeSelection::is_selectable(child) {
            let node_pos = pos - if dir < 0 { child.node_size() as isize } else { 0 };
            return NodeSelection::create(doc, node_pos as usize)
                .ok()
                .map(Selection::Node);
        }
        pos += child.node_size() as isize * dir as isize;
        i += dir as isize;
    }
}
