use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use textloom_model::{ContentKind, Node, NodeTypeSpec, Schema, SchemaSpec};
use textloom_state::{
    AppendFn, EditorState, KeyRegistry, Plugin, PluginSpec, Selection, StateConfig, Transaction,
};

fn schema() -> Schema {
    Schema::new(SchemaSpec {
        nodes: vec![
            NodeTypeSpec::block("doc", ContentKind::Block),
            NodeTypeSpec::block("paragraph", ContentKind::Inline),
            NodeTypeSpec::block("blockquote", ContentKind::Block),
            NodeTypeSpec::text(),
        ],
        marks: vec![],
        top_node: Some("doc".to_string()),
    })
    .unwrap()
}

fn para(schema: &Schema, text: &str) -> Node {
    schema
        .node("paragraph", vec![schema.text(text)], Vec::new())
        .unwrap()
}

fn big_doc(schema: &Schema) -> Node {
    let paragraphs = (0..100)
        .map(|i| para(schema, &format!("paragraph number {i} with some text")))
        .collect();
    schema.node("doc", paragraphs, Vec::new()).unwrap()
}

fn origin_of(tr: &Transaction) -> Option<String> {
    tr.get_meta::<String>("origin").cloned()
}

fn bench_apply(c: &mut Criterion) {
    let schema = schema();
    let state = EditorState::create(
        StateConfig::new(schema.clone()).with_doc(big_doc(&schema)),
    )
    .unwrap();

    c.bench_function("apply_insert_text", |b| {
        b.iter(|| {
            let mut tr = state.tr();
            tr.insert_text("x").unwrap();
            black_box(state.apply(tr).unwrap())
        })
    });
}

fn bench_pipeline_with_appending_plugin(c: &mut Criterion) {
    let schema = schema();
    let mut keys = KeyRegistry::new();
    let append: AppendFn = Arc::new(|_plugin, trs, _old, new_state| {
        if trs.iter().any(|tr| origin_of(tr).is_none()) {
            let end = new_state.doc().content().size() - 1;
            let mut tr = new_state.tr();
            tr.insert_text_at(".", end, end).ok()?;
            tr.set_meta("origin", "bench".to_string());
            Some(tr)
        } else {
            None
        }
    });
    let plugin = Plugin::new(
        PluginSpec {
            append_transaction: Some(append),
            ..PluginSpec::default()
        },
        &mut keys,
    );
    let state = EditorState::create(
        StateConfig::new(schema.clone())
            .with_doc(big_doc(&schema))
            .with_plugins(vec![plugin]),
    )
    .unwrap();

    c.bench_function("pipeline_one_appended_transaction", |b| {
        b.iter(|| {
            let mut tr = state.tr();
            tr.insert_text("x").unwrap();
            black_box(state.apply_transaction(tr).unwrap())
        })
    });
}

fn bench_selection_search(c: &mut Criterion) {
    let schema = schema();
    let doc = big_doc(&schema);
    let middle = doc.resolve(doc.content().size() / 2).unwrap();

    c.bench_function("selection_near_large_doc", |b| {
        b.iter(|| black_box(Selection::near(&middle, 1)))
    });
}

criterion_group!(
    benches,
    bench_apply,
    bench_pipeline_with_appending_plugin,
    bench_selection_search
);
criterion_main!(benches);
