//! Atomic, invertible document edits.

use textloom_model::{Fragment, Mark, Node, Slice};

use crate::error::TransformError;
use crate::map::{Mapping, StepMap};

/// Replace a range of the document with a slice.
#[derive(Debug, Clone)]
pub struct ReplaceStep {
    from: usize,
    to: usize,
    slice: Slice,
}

impl ReplaceStep {
    pub fn new(from: usize, to: usize, slice: Slice) -> ReplaceStep {
        ReplaceStep { from, to, slice }
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }

    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    fn apply(&self, doc: &Node) -> Result<Node, TransformError> {
        if self.from > self.to {
            return Err(TransformError::BadRange {
                from: self.from,
                to: self.to,
            });
        }
        Ok(doc.replace(self.from, self.to, &self.slice)?)
    }

    fn get_map(&self) -> StepMap {
        StepMap::new(vec![(self.from, self.to - self.from, self.slice.size())])
    }

    fn invert(&self, doc_before: &Node) -> Result<Step, TransformError> {
        let removed = doc_before.slice(self.from, self.to)?;
        Ok(Step::Replace(ReplaceStep::new(
            self.from,
            self.from + self.slice.size(),
            removed,
        )))
    }

    fn map(&self, mapping: &Mapping) -> Option<Step> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if from.deleted && to.deleted {
            return None;
        }
        Some(Step::Replace(ReplaceStep::new(
            from.pos,
            to.pos.max(from.pos),
            self.slice.clone(),
        )))
    }
}

/// Add a mark to all inline content in a range.
#[derive(Debug, Clone)]
pub struct AddMarkStep {
    from: usize,
    to: usize,
    mark: Mark,
}

impl AddMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> AddMarkStep {
        AddMarkStep { from, to, mark }
    }

    pub fn mark(&self) -> &Mark {
        &self.mark
    }
}

/// Remove a mark from all inline content in a range.
#[derive(Debug, Clone)]
pub struct RemoveMarkStep {
    from: usize,
    to: usize,
    mark: Mark,
}

impl RemoveMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> RemoveMarkStep {
        RemoveMarkStep { from, to, mark }
    }

    pub fn mark(&self) -> &Mark {
        &self.mark
    }
}

/// One atomic edit. Every step can be applied to a document, inverted
/// against the document it was applied to, mapped through a [`Mapping`],
/// and asked for its own [`StepMap`].
#[derive(Debug, Clone)]
pub enum Step {
    Replace(ReplaceStep),
    AddMark(AddMarkStep),
    RemoveMark(RemoveMarkStep),
}

impl Step {
    pub fn apply(&self, doc: &Node) -> Result<Node, TransformError> {
        match self {
            Step::Replace(step) => step.apply(doc),
            Step::AddMark(step) => {
                mark_step_apply(doc, step.from, step.to, &|node| {
                    node.mark(step.mark.add_to_set(node.marks()))
                })
            }
            Step::RemoveMark(step) => {
                mark_step_apply(doc, step.from, step.to, &|node| {
                    node.mark(step.mark.remove_from_set(node.marks()))
                })
            }
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(step) => step.get_map(),
            Step::AddMark(_) | Step::RemoveMark(_) => StepMap::identity(),
        }
    }

    /// The step that undoes this one, computed against the document the
    /// step was applied to.
    pub fn invert(&self, doc_before: &Node) -> Result<Step, TransformError> {
        match self {
            Step::Replace(step) => step.invert(doc_before),
            Step::AddMark(step) => Ok(Step::RemoveMark(RemoveMarkStep::new(
                step.from,
                step.to,
                step.mark.clone(),
            ))),
            Step::RemoveMark(step) => Ok(Step::AddMark(AddMarkStep::new(
                step.from,
                step.to,
                step.mark.clone(),
            ))),
        }
    }

    /// Map this step through a mapping, or `None` when the content it
    /// applied to is gone.
    pub fn map(&self, mapping: &Mapping) -> Option<Step> {
        match self {
            Step::Replace(step) => step.map(mapping),
            Step::AddMark(step) => {
                let (from, to) = map_mark_range(mapping, step.from, step.to)?;
                Some(Step::AddMark(AddMarkStep::new(from, to, step.mark.clone())))
            }
            Step::RemoveMark(step) => {
                let (from, to) = map_mark_range(mapping, step.from, step.to)?;
                Some(Step::RemoveMark(RemoveMarkStep::new(
                    from,
                    to,
                    step.mark.clone(),
                )))
            }
        }
    }
}

fn map_mark_range(mapping: &Mapping, from: usize, to: usize) -> Option<(usize, usize)> {
    let from = mapping.map_result(from, 1);
    let to = mapping.map_result(to, -1);
    if from.deleted && to.deleted || from.pos >= to.pos {
        return None;
    }
    Some((from.pos, to.pos))
}

/// Rebuild `node` with `f` applied to every inline node overlapping
/// `from..to` (positions relative to the node's content), splitting text
/// nodes at the range edges.
fn mark_step_apply(
    node: &Node,
    from: usize,
    to: usize,
    f: &dyn Fn(&Node) -> Node,
) -> Result<Node, TransformError> {
    if from > to {
        return Err(TransformError::BadRange { from, to });
    }
    Ok(apply_to_inline(node, from, to, f))
}

fn apply_to_inline(node: &Node, from: usize, to: usize, f: &dyn Fn(&Node) -> Node) -> Node {
    let mut children = Vec::with_capacity(node.child_count());
    let mut pos = 0;
    for child in node.content().iter() {
        let end = pos + child.node_size();
        if end <= from || pos >= to {
            children.push(child.clone());
        } else if child.is_text() {
            let start = from.saturating_sub(pos);
            let stop = (to - pos).min(child.node_size());
            if start > 0 {
                children.push(child.cut(0, start));
            }
            children.push(f(&child.cut(start, stop)));
            if stop < child.node_size() {
                children.push(child.cut(stop, child.node_size()));
            }
        } else if child.is_inline() {
            children.push(f(child));
        } else if child.is_leaf() {
            children.push(child.clone());
        } else {
            let inner_from = from.saturating_sub(pos + 1);
            let inner_to = (to.saturating_sub(pos + 1)).min(child.content().size());
            children.push(apply_to_inline(child, inner_from, inner_to, f));
        }
        pos = end;
    }
    node.copy(Fragment::from_nodes(children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use textloom_model::{ContentKind, MarkTypeSpec, NodeTypeSpec, Schema, SchemaSpec};

    fn schema() -> Schema {
        Schema::new(SchemaSpec {
            nodes: vec![
                NodeTypeSpec::block("doc", ContentKind::Block),
                NodeTypeSpec::block("paragraph", ContentKind::Inline),
                NodeTypeSpec::text(),
            ],
            marks: vec![MarkTypeSpec::new("em")],
            top_node: Some("doc".to_string()),
        })
        .unwrap()
    }

    fn doc_with_text(schema: &Schema, text: &str) -> Node {
        let p = schema
            .node("paragraph", vec![schema.text(text)], Vec::new())
            .unwrap();
        schema.node("doc", vec![p], Vec::new()).unwrap()
    }

    #[test]
    fn test_replace_step_apply_and_map() {
        let schema = schema();
        let doc = doc_with_text(&schema, "hello");
        let step = Step::Replace(ReplaceStep::new(
            2,
            5,
            Slice::new(Fragment::from_node(schema.text("a")), 0, 0),
        ));
        let after = step.apply(&doc).unwrap();
        assert_eq!(after.text_content(), "hao");

        let map = step.get_map();
        assert_eq!(map.map(1, 1), 1);
        assert_eq!(map.map(5, 1), 3);
        assert_eq!(map.map(6, 1), 4);
    }

    #[test]
    fn test_replace_step_invert_round_trips() {
        let schema = schema();
        let doc = doc_with_text(&schema, "hello");
        let step = Step::Replace(ReplaceStep::new(2, 4, Slice::empty()));
        let after = step.apply(&doc).unwrap();
        let inverted = step.invert(&doc).unwrap();
        let restored = inverted.apply(&after).unwrap();
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_add_mark_step_splits_text() {
        let schema = schema();
        let doc = doc_with_text(&schema, "hello");
        let em = schema.mark("em").unwrap();
        let step = Step::AddMark(AddMarkStep::new(2, 4, em.clone()));
        let after = step.apply(&doc).unwrap();

        let para = after.child(0);
        assert_eq!(para.child_count(), 3);
        assert_eq!(para.child(0).text(), Some("h"));
        assert_eq!(para.child(1).text(), Some("el"));
        assert!(em.is_in_set(para.child(1).marks()));
        assert_eq!(para.child(2).text(), Some("lo"));
        assert!(para.child(2).marks().is_empty());
    }

    #[test]
    fn test_mark_steps_invert_each_other() {
        let schema = schema();
        let doc = doc_with_text(&schema, "hello");
        let em = schema.mark("em").unwrap();
        let step = Step::AddMark(AddMarkStep::new(1, 6, em));
        let after = step.apply(&doc).unwrap();
        let back = step.invert(&doc).unwrap().apply(&after).unwrap();
        assert_eq!(back.text_content(), "hello");
        assert!(back.child(0).child(0).marks().is_empty());
    }

    #[test]
    fn test_step_map_through_mapping() {
        let schema = schema();
        let em = schema.mark("em").unwrap();
        let step = Step::AddMark(AddMarkStep::new(2, 4, em));
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(vec![(0, 0, 3)]));
        match step.map(&mapping) {
            Some(Step::AddMark(mapped)) => {
                assert_eq!((mapped.from, mapped.to), (5, 7));
            }
            other => panic!("unexpected mapping result: {other:?}"),
        }
    }

    #[test]
    fn test_step_vanishes_when_range_deleted() {
        let schema = schema();
        let em = schema.mark("em").unwrap();
        let step = Step::AddMark(AddMarkStep::new(2, 4, em));
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(vec![(1, 5, 0)]));
        assert!(step.map(&mapping).is_none());
    }
}
