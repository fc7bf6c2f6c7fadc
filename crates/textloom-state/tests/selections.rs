//! Selection search, mapping, bookmarks and JSON round-trips.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;
use textloom_model::{ContentKind, Node, NodeTypeSpec, Schema, SchemaSpec};
use textloom_transform::{Mapping, StepMap};
use textloom_state::{
    AllSelection, CustomSelection, NodeSelection, Selection, SelectionBookmark,
    SelectionDelegate, StateError, TextSelection, register_selection_variant,
};

fn schema() -> Schema {
    Schema::new(SchemaSpec {
        nodes: vec![
            NodeTypeSpec::block("doc", ContentKind::Block),
            NodeTypeSpec::block("paragraph", ContentKind::Inline),
            NodeTypeSpec::block("blockquote", ContentKind::Block),
            NodeTypeSpec::atom("horizontal_rule", false),
            NodeTypeSpec::text(),
        ],
        marks: vec![],
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

fn rule(schema: &Schema) -> Node {
    schema.node("horizontal_rule", vec![], Vec::new()).unwrap()
}

fn doc(schema: &Schema, children: Vec<Node>) -> Node {
    schema.node("doc", children, Vec::new()).unwrap()
}

#[test]
fn test_at_start_finds_first_cursor_position() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "hi")]);
    let sel = Selection::at_start(&d);
    assert_eq!(sel.text_cursor().unwrap().pos(), 1);
}

#[test]
fn test_at_start_descends_into_nested_blocks() {
    let schema = schema();
    let nested = schema
        .node("blockquote", vec![para(&schema, "deep")], Vec::new())
        .unwrap();
    let d = doc(&schema, vec![nested]);
    let sel = Selection::at_start(&d);
    assert_eq!(sel.text_cursor().unwrap().pos(), 2);
}

#[test]
fn test_at_end_finds_last_cursor_position() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "hi"), para(&schema, "yo")]);
    let sel = Selection::at_end(&d);
    assert_eq!(sel.text_cursor().unwrap().pos(), 7);
}

#[test]
fn test_at_start_selects_leading_atom() {
    let schema = schema();
    let d = doc(&schema, vec![rule(&schema), para(&schema, "x")]);
    match Selection::at_start(&d) {
        Selection::Node(sel) => {
            assert_eq!(sel.resolved_anchor().pos(), 0);
            assert_eq!(sel.node().node_type().name(), "horizontal_rule");
        }
        other => panic!("expected a node selection, got {other:?}"),
    }
}

#[test]
fn test_near_falls_back_to_all_selection_on_empty_document() {
    let schema = schema();
    let d = doc(&schema, vec![]);
    let pos = d.resolve(0).unwrap();
    match Selection::near(&pos, 1) {
        Selection::All(_) => {}
        other => panic!("expected whole-document fallback, got {other:?}"),
    }
    assert!(matches!(Selection::at_start(&d), Selection::All(_)));
    assert!(matches!(Selection::at_end(&d), Selection::All(_)));
}

#[test]
fn test_near_searches_both_directions() {
    let schema = schema();
    // the only cursor position is before the boundary position
    let d = doc(&schema, vec![para(&schema, "ab"), rule(&schema)]);
    let pos = d.resolve(5).unwrap();
    let sel = Selection::near(&pos, 1);
    // nothing lies forward of the document end, so the reverse search
    // finds the trailing atom
    match sel {
        Selection::Node(node_sel) => {
            assert_eq!(node_sel.node().node_type().name(), "horizontal_rule")
        }
        other => panic!("unexpected selection {other:?}"),
    }
}

#[test]
fn test_node_selection_spans_its_node() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "ab"), rule(&schema)]);
    let sel = NodeSelection::create(&d, 4).unwrap();
    assert_eq!(sel.resolved_anchor().pos(), 4);
    assert_eq!(sel.resolved_head().pos(), 5);
    let sel = Selection::Node(sel);
    assert_eq!(sel.from(), 4);
    assert_eq!(sel.to(), 5);
    assert!(!sel.visible());
}

#[test]
fn test_node_selection_requires_selectable_node() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "ab")]);
    // position 1 is followed by text, which is never selectable
    assert!(matches!(
        NodeSelection::create(&d, 1),
        Err(StateError::NoNodeAt(1))
    ));
}

#[test]
fn test_between_moves_endpoints_into_inline_content() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "ab"), para(&schema, "cd")]);
    // both endpoints on block boundaries
    let anchor = d.resolve(0).unwrap();
    let head = d.resolve(8).unwrap();
    match TextSelection::between(&anchor, &head, None) {
        Selection::Text(sel) => {
            assert_eq!(sel.resolved_anchor().pos(), 1);
            assert_eq!(sel.resolved_head().pos(), 7);
        }
        other => panic!("expected a text selection, got {other:?}"),
    }
}

#[test]
fn test_identity_mapping_keeps_selection() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "hello")]);
    let sel = Selection::Text(TextSelection::create(&d, 2, 4).unwrap());
    let mapped = sel.map(&d, &Mapping::new());
    assert_eq!(mapped.anchor(), 2);
    assert_eq!(mapped.head(), 4);
    assert_eq!(sel, mapped);
}

#[test]
fn test_text_selection_maps_through_insertion() {
    let schema = schema();
    let before = doc(&schema, vec![para(&schema, "world")]);
    let after = doc(&schema, vec![para(&schema, "big world")]);
    let sel = Selection::Text(TextSelection::create(&before, 1, 6).unwrap());
    let mut mapping = Mapping::new();
    mapping.append_map(StepMap::new(vec![(1, 0, 4)]));
    let mapped = sel.map(&after, &mapping);
    assert_eq!(mapped.anchor(), 5);
    assert_eq!(mapped.head(), 10);
}

#[test]
fn test_node_selection_degrades_when_node_deleted() {
    let schema = schema();
    let before = doc(&schema, vec![para(&schema, "ab"), rule(&schema)]);
    let after = doc(&schema, vec![para(&schema, "ab")]);
    let sel = Selection::Node(NodeSelection::create(&before, 4).unwrap());
    let mut mapping = Mapping::new();
    mapping.append_map(StepMap::new(vec![(4, 1, 0)]));
    let mapped = sel.map(&after, &mapping);
    // falls back to the nearest text position
    assert_eq!(mapped.text_cursor().unwrap().pos(), 3);
}

#[test]
fn test_bookmark_round_trips_each_variant() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "ab"), rule(&schema)]);

    let text = Selection::Text(TextSelection::create(&d, 1, 3).unwrap());
    assert_eq!(text.get_bookmark().resolve(&d), text);

    let node = Selection::Node(NodeSelection::create(&d, 4).unwrap());
    assert_eq!(node.get_bookmark().resolve(&d), node);

    let all = Selection::All(AllSelection::new(&d));
    assert_eq!(all.get_bookmark().resolve(&d), all);
}

#[test]
fn test_node_bookmark_degrades_to_text_when_mapped_over_deletion() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "ab"), rule(&schema)]);
    let bookmark = Selection::Node(NodeSelection::create(&d, 4).unwrap()).get_bookmark();

    let mut mapping = Mapping::new();
    mapping.append_map(StepMap::new(vec![(4, 1, 0)]));
    match bookmark.map(&mapping) {
        SelectionBookmark::Text { anchor, head } => {
            assert_eq!(anchor, 4);
            assert_eq!(head, 4);
        }
        other => panic!("expected degradation to a text bookmark, got {other:?}"),
    }
}

#[test]
fn test_bookmark_resolve_clamps_out_of_range_positions() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "ab")]);
    let bookmark = SelectionBookmark::Text {
        anchor: 50,
        head: 60,
    };
    let sel = bookmark.resolve(&d);
    // clamped to the end of the only paragraph
    assert_eq!(sel.text_cursor().unwrap().pos(), 3);
}

#[test]
fn test_selection_json_round_trips() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "ab"), rule(&schema)]);

    for sel in [
        Selection::Text(TextSelection::create(&d, 1, 3).unwrap()),
        Selection::Node(NodeSelection::create(&d, 4).unwrap()),
        Selection::All(AllSelection::new(&d)),
    ] {
        let parsed = Selection::from_json(&d, &sel.to_json()).unwrap();
        assert_eq!(parsed, sel);
    }
}

#[test]
fn test_selection_json_shapes() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "ab"), rule(&schema)]);
    let text = Selection::Text(TextSelection::create(&d, 1, 3).unwrap());
    assert_eq!(
        text.to_json(),
        serde_json::json!({"type": "text", "anchor": 1, "head": 3})
    );
    let node = Selection::Node(NodeSelection::create(&d, 4).unwrap());
    assert_eq!(node.to_json(), serde_json::json!({"type": "node", "anchor": 4}));
    let all = Selection::All(AllSelection::new(&d));
    assert_eq!(all.to_json(), serde_json::json!({"type": "all"}));
}

#[rstest]
#[case::not_an_object(serde_json::json!(null))]
#[case::missing_type(serde_json::json!({}))]
#[case::missing_head(serde_json::json!({"type": "text", "anchor": 1}))]
#[case::unknown_type(serde_json::json!({"type": "teleport"}))]
#[case::out_of_range(serde_json::json!({"type": "text", "anchor": 1, "head": 9000}))]
fn test_malformed_selection_json_fails(#[case] bad: Value) {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "ab")]);
    assert!(Selection::from_json(&d, &bad).is_err(), "accepted {bad}");
}

#[derive(Debug)]
struct SpanDelegate;

impl SpanDelegate {
    fn make(doc: &Node, anchor: usize, head: usize) -> Result<Selection, StateError> {
        Ok(Selection::Custom(CustomSelection::new(
            doc.resolve(anchor)?,
            doc.resolve(head)?,
            None,
            Arc::new(SpanDelegate),
        )))
    }
}

impl SelectionDelegate for SpanDelegate {
    fn json_id(&self) -> &str {
        "span"
    }

    fn map(
        &self,
        doc: &Node,
        mapping: &Mapping,
        sel: &CustomSelection,
    ) -> Selection {
        let anchor = mapping.map(sel.resolved_anchor().pos(), 1);
        let head = mapping.map(sel.resolved_head().pos(), 1);
        SpanDelegate::make(doc, anchor, head).unwrap_or_else(|_| {
            let pos = doc.resolve(0).expect("position 0 resolves");
            Selection::near(&pos, 1)
        })
    }

    fn to_json(&self, sel: &CustomSelection) -> Value {
        serde_json::json!({
            "type": "span",
            "anchor": sel.resolved_anchor().pos(),
            "head": sel.resolved_head().pos(),
        })
    }
}

fn span_anchor_head(value: &Value, key: &str) -> Result<usize, StateError> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or(StateError::UnknownSelectionType("span".to_string()))
}

#[test]
fn test_custom_variant_registers_and_round_trips() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "hello")]);

    register_selection_variant(
        "span",
        Arc::new(|doc, json| {
            SpanDelegate::make(
                doc,
                span_anchor_head(json, "anchor")?,
                span_anchor_head(json, "head")?,
            )
        }),
    )
    .unwrap();

    let sel = SpanDelegate::make(&d, 2, 5).unwrap();
    let parsed = Selection::from_json(&d, &sel.to_json()).unwrap();
    assert_eq!(parsed, sel);
    assert!(parsed.visible());

    // registering the same id again fails
    let again = register_selection_variant(
        "span",
        Arc::new(|doc, _json| {
            let pos = doc.resolve(0)?;
            Ok(Selection::near(&pos, 1))
        }),
    );
    assert!(matches!(
        again,
        Err(StateError::DuplicateSelectionVariant(_))
    ));
}

#[test]
fn test_builtin_variant_ids_cannot_be_shadowed() {
    for id in ["text", "node", "all"] {
        let result = register_selection_variant(
            id,
            Arc::new(|doc: &Node, _json: &Value| {
                let pos = doc.resolve(0)?;
                Ok(Selection::near(&pos, 1))
            }),
        );
        assert!(matches!(
            result,
            Err(StateError::DuplicateSelectionVariant(_))
        ));
    }
}

#[test]
fn test_ranges_are_ordered_and_nonempty() {
    let schema = schema();
    let d = doc(&schema, vec![para(&schema, "hello")]);
    // head before anchor still yields an ordered first range
    let sel = Selection::Text(TextSelection::create(&d, 5, 2).unwrap());
    let ranges = sel.ranges();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].from().pos(), 2);
    assert_eq!(ranges[0].to().pos(), 5);
    assert_eq!(sel.from(), 2);
    assert_eq!(sel.to(), 5);
    assert_eq!(sel.anchor(), 5);
    assert_eq!(sel.head(), 2);
}
