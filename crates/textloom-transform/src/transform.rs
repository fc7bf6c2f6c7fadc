//! The step accumulator.

use textloom_model::{Fragment, Mark, Node, Slice};

use crate::error::TransformError;
use crate::map::Mapping;
use crate::step::{AddMarkStep, RemoveMarkStep, ReplaceStep, Step};

/// An append-only log of steps applied against a starting document. Holds
/// the document before each step, the current document, and the cumulative
/// position mapping from the starting revision to the current one.
#[derive(Debug, Clone)]
pub struct Transform {
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
}

impl Transform {
    pub fn new(doc: Node) -> Transform {
        Transform {
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    /// The current document, with every step applied.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document this transform started from.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The document before each step, in step order.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a step and record it.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, TransformError> {
        let new_doc = step.apply(&self.doc)?;
        self.docs.push(std::mem::replace(&mut self.doc, new_doc));
        self.mapping.append_map(step.get_map());
        self.steps.push(step);
        Ok(self)
    }

    /// Replace `from..to` with a slice. A no-op replace (empty slice over
    /// an empty range) adds no step.
    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        slice: Slice,
    ) -> Result<&mut Self, TransformError> {
        if from == to && slice.content().size() == 0 {
            return Ok(self);
        }
        self.step(Step::Replace(ReplaceStep::new(from, to, slice)))
    }

    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        node: Node,
    ) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::new(Fragment::from_node(node), 0, 0))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::empty())
    }

    pub fn add_mark(
        &mut self,
        from: usize,
        to: usize,
        mark: Mark,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::AddMark(AddMarkStep::new(from, to, mark)))
    }

    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        mark: Mark,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::RemoveMark(RemoveMarkStep::new(from, to, mark)))
    }
}
