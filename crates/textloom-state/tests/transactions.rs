//! Transaction building and application against single states.

use pretty_assertions::assert_eq;
use textloom_model::{ContentKind, MarkTypeSpec, Node, NodeTypeSpec, Schema, SchemaSpec};
use textloom_state::{
    EditorState, NodeSelection, Selection, StateConfig, StateError, TextSelection,
};

fn schema() -> Schema {
    Schema::new(SchemaSpec {
        nodes: vec![
            NodeTypeSpec::block("doc", ContentKind::Block),
            NodeTypeSpec::block("paragraph", ContentKind::Inline),
            NodeTypeSpec::atom("horizontal_rule", false),
            NodeTypeSpec::text(),
        ],
        marks: vec![MarkTypeSpec::new("em"), MarkTypeSpec::new("strong")],
        top_node: Some("doc".to_string()),
    })
    .unwrap()
}

fn para(schema: &Schema, text: &str) -> Node {
    let children = if text.is_empty() {
        vec![]
    } else {
        vec![schema.text(text)]
    };
    schema.node("paragraph", children, Vec::new()).unwrap()
}

fn doc(schema: &Schema, children: Vec<Node>) -> Node {
    schema.node("doc", children, Vec::new()).unwrap()
}

fn state_with_doc(schema: &Schema, doc: Node) -> EditorState {
    EditorState::create(StateConfig::new(schema.clone()).with_doc(doc)).unwrap()
}

#[test]
fn test_insert_text_into_empty_paragraph() {
    let schema = schema();
    // a fresh state defaults to an empty document with a cursor at its start
    let state = EditorState::create(StateConfig::new(schema.clone())).unwrap();
    assert_eq!(state.doc(), &doc(&schema, vec![para(&schema, "")]));

    let mut tr = state.tr();
    tr.insert_text("hi").unwrap();
    let next = state.apply(tr).unwrap();

    assert_eq!(next.doc(), &doc(&schema, vec![para(&schema, "hi")]));
    let cursor = next.selection().text_cursor().expect("cursor after typing");
    assert_eq!(cursor.pos(), 3);
}

#[test]
fn test_apply_doc_matches_transaction_doc() {
    let schema = schema();
    let state = state_with_doc(&schema, doc(&schema, vec![para(&schema, "abc")]));
    let mut tr = state.tr();
    tr.insert_text_at("xyz", 2, 2).unwrap();
    let expected = tr.doc().clone();
    let next = state.apply(tr).unwrap();
    assert_eq!(next.doc(), &expected);
}

#[test]
fn test_delete_paragraph_content_leaves_cursor() {
    let schema = schema();
    let state_doc = doc(&schema, vec![para(&schema, "hello")]);
    let selection = Selection::Text(TextSelection::create(&state_doc, 1, 6).unwrap());
    let state = EditorState::create(
        StateConfig::new(schema.clone())
            .with_doc(state_doc)
            .with_selection(selection),
    )
    .unwrap();

    let mut tr = state.tr();
    tr.delete_selection().unwrap();
    let next = state.apply(tr).unwrap();

    assert_eq!(next.doc(), &doc(&schema, vec![para(&schema, "")]));
    // a cursor inside the now-empty paragraph, not a node selection
    let cursor = next
        .selection()
        .text_cursor()
        .expect("deleting text leaves a cursor");
    assert_eq!(cursor.pos(), 1);
}

#[test]
fn test_selection_is_remapped_lazily_through_edits() {
    let schema = schema();
    let state_doc = doc(&schema, vec![para(&schema, "world")]);
    let selection = Selection::Text(TextSelection::create(&state_doc, 4, 4).unwrap());
    let state = EditorState::create(
        StateConfig::new(schema.clone())
            .with_doc(state_doc)
            .with_selection(selection),
    )
    .unwrap();

    let mut tr = state.tr();
    tr.insert_text_at("say ", 1, 1).unwrap();
    // the held selection moved right by the four inserted chars
    assert_eq!(tr.selection().text_cursor().unwrap().pos(), 8);
    // reading again after more steps keeps remapping from the memoized point
    tr.insert_text_at("!", 10, 10).unwrap();
    assert_eq!(tr.selection().text_cursor().unwrap().pos(), 8);
}

#[test]
fn test_set_selection_rejects_foreign_document() {
    let schema = schema();
    let state = state_with_doc(&schema, doc(&schema, vec![para(&schema, "one")]));
    let other_doc = doc(&schema, vec![para(&schema, "different text")]);
    let foreign = Selection::Text(TextSelection::create(&other_doc, 1, 1).unwrap());

    let mut tr = state.tr();
    let result = tr.set_selection(foreign);
    assert!(matches!(
        result,
        Err(StateError::SelectionOutsideDocument(_))
    ));
}

#[test]
fn test_set_selection_clears_stored_marks_override() {
    let schema = schema();
    let state = state_with_doc(&schema, doc(&schema, vec![para(&schema, "ab")]));
    let mut tr = state.tr();
    tr.set_stored_marks(Some(vec![schema.mark("em").unwrap()]));
    assert!(tr.stored_marks_set());

    let cursor = Selection::Text(TextSelection::create(tr.doc(), 2, 2).unwrap());
    tr.set_selection(cursor).unwrap();
    assert!(!tr.stored_marks_set());
    assert!(tr.stored_marks().is_none());
    assert!(tr.selection_set());
}

#[test]
fn test_edit_step_clears_stored_marks_override() {
    let schema = schema();
    let state = state_with_doc(&schema, doc(&schema, vec![para(&schema, "ab")]));
    let mut tr = state.tr();
    tr.set_stored_marks(Some(vec![schema.mark("em").unwrap()]));
    tr.insert_text_at("x", 1, 1).unwrap();
    assert!(!tr.stored_marks_set());
    assert!(tr.stored_marks().is_none());
}

#[test]
fn test_ensure_marks_is_noop_when_matching() {
    let schema = schema();
    let state = state_with_doc(&schema, doc(&schema, vec![para(&schema, "ab")]));
    let mut tr = state.tr();
    // the cursor sits in unmarked text, so ensuring "no marks" changes nothing
    tr.ensure_marks(Vec::new());
    assert!(!tr.stored_marks_set());

    tr.add_stored_mark(schema.mark("em").unwrap());
    assert!(tr.stored_marks_set());
    assert_eq!(tr.stored_marks().unwrap().len(), 1);

    tr.remove_stored_mark(&schema.mark("em").unwrap());
    assert!(tr.stored_marks().unwrap().is_empty());
}

#[test]
fn test_stored_marks_survive_only_at_cursor() {
    let schema = schema();
    let state = state_with_doc(&schema, doc(&schema, vec![para(&schema, "abc")]));
    let mut tr = state.tr();
    tr.set_stored_marks(Some(vec![schema.mark("strong").unwrap()]));
    let next = state.apply(tr).unwrap();
    assert_eq!(next.stored_marks().unwrap().len(), 1);

    // a non-cursor selection drops stored marks
    let mut tr = next.tr();
    let span = Selection::Text(TextSelection::create(tr.doc(), 1, 3).unwrap());
    tr.set_selection(span).unwrap();
    tr.set_stored_marks(Some(vec![schema.mark("strong").unwrap()]));
    let next = next.apply(tr).unwrap();
    assert!(next.stored_marks().is_none());
}

#[test]
fn test_meta_and_is_generic() {
    let schema = schema();
    let state = state_with_doc(&schema, doc(&schema, vec![para(&schema, "a")]));
    let mut tr = state.tr();
    assert!(tr.is_generic());

    tr.set_meta("origin", "paste".to_string());
    assert!(!tr.is_generic());
    assert_eq!(tr.get_meta::<String>("origin").unwrap(), "paste");
    assert!(tr.get_meta::<String>("missing").is_none());
    // wrong type reads as absent
    assert!(tr.get_meta::<u64>("origin").is_none());
}

#[test]
fn test_scroll_into_view_bumps_counter() {
    let schema = schema();
    let state = state_with_doc(&schema, doc(&schema, vec![para(&schema, "a")]));
    assert_eq!(state.scroll_to_selection(), 0);

    let mut tr = state.tr();
    tr.scroll_into_view();
    let next = state.apply(tr).unwrap();
    assert_eq!(next.scroll_to_selection(), 1);

    // a transaction without the request leaves the counter alone
    let mut tr = next.tr();
    tr.insert_text("x").unwrap();
    let next = next.apply(tr).unwrap();
    assert_eq!(next.scroll_to_selection(), 1);
}

#[test]
fn test_apply_inner_rejects_mismatched_revision() {
    let schema = schema();
    let state = state_with_doc(&schema, doc(&schema, vec![para(&schema, "a")]));
    let mut tr = state.tr();
    tr.insert_text("b").unwrap();
    let next = state.apply(tr).unwrap();

    // a transaction built from the old state cannot apply to the new one
    let stale = state.tr();
    assert!(matches!(
        next.apply_inner(&stale),
        Err(StateError::MismatchedTransaction)
    ));
}

#[test]
fn test_replace_node_selection_with_block_node() {
    let schema = schema();
    let state_doc = doc(&schema, vec![para(&schema, "ab"), para(&schema, "cd")]);
    let selection = Selection::Node(NodeSelection::create(&state_doc, 0).unwrap());
    let state = EditorState::create(
        StateConfig::new(schema.clone())
            .with_doc(state_doc)
            .with_selection(selection),
    )
    .unwrap();

    let rule = schema.node("horizontal_rule", vec![], Vec::new()).unwrap();
    let mut tr = state.tr();
    tr.replace_selection_with(rule, false).unwrap();
    let next = state.apply(tr).unwrap();

    let expected_rule = schema.node("horizontal_rule", vec![], Vec::new()).unwrap();
    assert_eq!(
        next.doc(),
        &doc(&schema, vec![expected_rule, para(&schema, "cd")])
    );
    // the cursor lands in the paragraph after the inserted block
    assert_eq!(next.selection().text_cursor().unwrap().pos(), 2);
}
