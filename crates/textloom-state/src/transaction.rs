//! Transactions: the only way a state changes.
//!
//! A transaction starts from one state and accumulates document steps plus
//! selection, stored-mark and metadata overrides. It stays mutable while
//! being built; folding it into a new state consumes it, so an applied
//! transaction cannot be reused.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use textloom_model::{Mark, Node, Schema, Slice};
use textloom_transform::{Mapping, Step, Transform};
use uuid::Uuid;

use crate::error::StateError;
use crate::plugin::{Plugin, PluginKey};
use crate::selection::Selection;
use crate::state::EditorState;

/// Stable identity of a transaction. The pipeline tags appended
/// transactions with the id of the root they were derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    fn new() -> TransactionId {
        TransactionId(Uuid::new_v4())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A metadata key: a plain string, or a plugin's identity.
pub struct MetaKey(String);

impl From<&str> for MetaKey {
    fn from(key: &str) -> MetaKey {
        MetaKey(key.to_string())
    }
}

impl From<&PluginKey> for MetaKey {
    fn from(key: &PluginKey) -> MetaKey {
        MetaKey(key.id().to_string())
    }
}

impl From<&Plugin> for MetaKey {
    fn from(plugin: &Plugin) -> MetaKey {
        MetaKey(plugin.key().to_string())
    }
}

/// The metadata key the pipeline tags appended transactions with.
pub const APPENDED_TRANSACTION: &str = "appendedTransaction";

const UPDATED_SELECTION: u8 = 1;
const UPDATED_MARKS: u8 = 2;
const UPDATED_SCROLL: u8 = 4;

/// A document edit in progress: an append-only step log plus pending
/// selection/stored-marks overrides and a metadata map for inter-plugin
/// communication.
pub struct Transaction {
    id: TransactionId,
    /// Creation time, in milliseconds since the epoch.
    time: u64,
    schema: Schema,
    transform: Transform,
    /// The held selection and the step count it is valid for; re-mapped
    /// lazily when read after more steps were added.
    selection: RefCell<(Selection, usize)>,
    stored_marks: Option<Vec<Mark>>,
    updated: u8,
    meta: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Transaction {
    pub(crate) fn new(state: &EditorState) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            schema: state.schema().clone(),
            transform: Transform::new(state.doc().clone()),
            selection: RefCell::new((state.selection().clone(), 0)),
            stored_marks: state.stored_marks().map(<[Mark]>::to_vec),
            updated: 0,
            meta: HashMap::new(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn set_time(&mut self, time: u64) -> &mut Self {
        self.time = time;
        self
    }

    /// The document after all of this transaction's steps.
    pub fn doc(&self) -> &Node {
        self.transform.doc()
    }

    /// The document this transaction was built from.
    pub fn before(&self) -> &Node {
        self.transform.before()
    }

    pub fn steps(&self) -> &[Step] {
        self.transform.steps()
    }

    pub fn docs(&self) -> &[Node] {
        self.transform.docs()
    }

    pub fn mapping(&self) -> &Mapping {
        self.transform.mapping()
    }

    pub fn doc_changed(&self) -> bool {
        self.transform.doc_changed()
    }

    /// The transaction's current selection: the held selection re-mapped
    /// through any steps added since it was last read or set. The re-map
    /// is memoized against the step count.
    pub fn selection(&self) -> Selection {
        let mut held = self.selection.borrow_mut();
        let steps = self.transform.steps().len();
        if held.1 < steps {
            let mapped = held
                .0
                .map(self.transform.doc(), &self.transform.mapping().slice_from(held.1));
            *held = (mapped, steps);
        }
        held.0.clone()
    }

    /// Override the selection. Fails when the selection's anchor was not
    /// resolved against this transaction's current document. Explicitly
    /// setting the selection discards any pending stored-marks override.
    pub fn set_selection(&mut self, selection: Selection) -> Result<&mut Self, StateError> {
        if selection.resolved_anchor().doc() != self.transform.doc() {
            return Err(StateError::SelectionOutsideDocument(selection.anchor()));
        }
        *self.selection.borrow_mut() = (selection, self.transform.steps().len());
        self.updated = (self.updated | UPDATED_SELECTION) & !UPDATED_MARKS;
        self.stored_marks = None;
        Ok(self)
    }

    /// Whether the selection was explicitly set on this transaction.
    pub fn selection_set(&self) -> bool {
        self.updated & UPDATED_SELECTION > 0
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks;
        self.updated |= UPDATED_MARKS;
        self
    }

    /// Whether the stored marks were explicitly set on this transaction.
    pub fn stored_marks_set(&self) -> bool {
        self.updated & UPDATED_MARKS > 0
    }

    /// Make sure the stored marks (or, without an override, the marks at
    /// the selection) match the given set; a no-op when they already do.
    pub fn ensure_marks(&mut self, marks: Vec<Mark>) -> &mut Self {
        let current = self
            .stored_marks
            .clone()
            .unwrap_or_else(|| self.selection().resolved_from().marks());
        if !Mark::same_set(&current, &marks) {
            self.set_stored_marks(Some(marks));
        }
        self
    }

    pub fn add_stored_mark(&mut self, mark: Mark) -> &mut Self {
        let base = self
            .stored_marks
            .clone()
            .unwrap_or_else(|| self.selection().resolved_head().marks());
        let marks = mark.add_to_set(&base);
        self.ensure_marks(marks)
    }

    pub fn remove_stored_mark(&mut self, mark: &Mark) -> &mut Self {
        let base = self
            .stored_marks
            .clone()
            .unwrap_or_else(|| self.selection().resolved_head().marks());
        let marks = mark.remove_from_set(&base);
        self.ensure_marks(marks)
    }

    /// Apply and record a step. Any pending stored-marks override is
    /// dropped: the position it was computed for no longer means the same
    /// thing.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, StateError> {
        self.transform.step(step)?;
        self.marks_invalidated_by_edit();
        Ok(self)
    }

    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        slice: Slice,
    ) -> Result<&mut Self, StateError> {
        let steps_before = self.transform.steps().len();
        self.transform.replace(from, to, slice)?;
        if self.transform.steps().len() > steps_before {
            self.marks_invalidated_by_edit();
        }
        Ok(self)
    }

    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        node: Node,
    ) -> Result<&mut Self, StateError> {
        self.transform.replace_with(from, to, node)?;
        self.marks_invalidated_by_edit();
        Ok(self)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, StateError> {
        let steps_before = self.transform.steps().len();
        self.transform.delete(from, to)?;
        if self.transform.steps().len() > steps_before {
            self.marks_invalidated_by_edit();
        }
        Ok(self)
    }

    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self, StateError> {
        self.transform.add_mark(from, to, mark)?;
        self.marks_invalidated_by_edit();
        Ok(self)
    }

    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        mark: Mark,
    ) -> Result<&mut Self, StateError> {
        self.transform.remove_mark(from, to, mark)?;
        self.marks_invalidated_by_edit();
        Ok(self)
    }

    fn marks_invalidated_by_edit(&mut self) {
        self.updated &= !UPDATED_MARKS;
        self.stored_marks = None;
    }

    /// Replace the selection with a slice.
    pub fn replace_selection(&mut self, slice: Slice) -> Result<&mut Self, StateError> {
        let selection = self.selection();
        selection.replace(self, slice)?;
        Ok(self)
    }

    /// Replace the selection with a single node. With `inherit_marks`, the
    /// node takes the stored marks, or the marks at the selection.
    pub fn replace_selection_with(
        &mut self,
        node: Node,
        inherit_marks: bool,
    ) -> Result<&mut Self, StateError> {
        let selection = self.selection();
        let node = if inherit_marks {
            let marks = self.stored_marks.clone().unwrap_or_else(|| {
                if selection.empty() {
                    selection.resolved_from().marks()
                } else {
                    selection
                        .resolved_from()
                        .marks_across(selection.resolved_to())
                        .unwrap_or_default()
                }
            });
            node.mark(marks)
        } else {
            node
        };
        selection.replace_with(self, node)?;
        Ok(self)
    }

    /// Delete the selection.
    pub fn delete_selection(&mut self) -> Result<&mut Self, StateError> {
        let selection = self.selection();
        selection.replace(self, Slice::empty())?;
        Ok(self)
    }

    /// Replace the selection with a text node carrying the appropriate
    /// marks; with empty text, delete the selection.
    pub fn insert_text(&mut self, text: &str) -> Result<&mut Self, StateError> {
        if text.is_empty() {
            return self.delete_selection();
        }
        let node = self.schema.text(text);
        self.replace_selection_with(node, true)
    }

    /// Insert text over an explicit range instead of the selection.
    pub fn insert_text_at(
        &mut self,
        text: &str,
        from: usize,
        to: usize,
    ) -> Result<&mut Self, StateError> {
        if text.is_empty() {
            return self.delete(from, to);
        }
        let marks = match self.stored_marks.clone() {
            Some(marks) => marks,
            None => {
                let rfrom = self.doc().resolve(from)?;
                if to == from {
                    rfrom.marks()
                } else {
                    let rto = self.doc().resolve(to)?;
                    rfrom.marks_across(&rto).unwrap_or_default()
                }
            }
        };
        let node = self.schema.text_with_marks(text, marks);
        self.replace_with(from, to, node)?;
        if !self.selection().empty() {
            let near = Selection::near(self.selection().resolved_to(), 1);
            self.set_selection(near)?;
        }
        Ok(self)
    }

    /// Attach a metadata value under a string or plugin key.
    pub fn set_meta<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<MetaKey>,
        value: T,
    ) -> &mut Self {
        self.meta.insert(key.into().0, Arc::new(value));
        self
    }

    pub fn get_meta<T: Any + Send + Sync>(&self, key: impl Into<MetaKey>) -> Option<&T> {
        self.meta
            .get(&key.into().0)
            .and_then(|value| value.downcast_ref())
    }

    /// True when no metadata was attached. Consumers (e.g. a history
    /// mechanism) use this to decide whether adjacent transactions may be
    /// coalesced.
    pub fn is_generic(&self) -> bool {
        self.meta.is_empty()
    }

    /// Ask the view to scroll the selection into view after this
    /// transaction is applied.
    pub fn scroll_into_view(&mut self) -> &mut Self {
        self.updated |= UPDATED_SCROLL;
        self
    }

    pub fn scrolled_into_view(&self) -> bool {
        self.updated & UPDATED_SCROLL > 0
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("steps", &self.transform.steps().len())
            .field("doc", self.doc())
            .finish()
    }
}
