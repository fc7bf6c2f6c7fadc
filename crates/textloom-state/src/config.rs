//! Configurations: the derived, ordered field layout of a state.

use std::collections::HashMap;
use std::sync::Arc;

use textloom_model::{Mark, Node, Schema};

use crate::error::StateError;
use crate::plugin::Plugin;
use crate::selection::Selection;

/// Input for creating (or deserializing) a state: the schema, optional
/// starting values for the built-in fields, and the ordered plugin list.
#[derive(Clone)]
pub struct StateConfig {
    pub schema: Schema,
    pub doc: Option<Node>,
    pub selection: Option<Selection>,
    pub stored_marks: Option<Vec<Mark>>,
    pub plugins: Vec<Arc<Plugin>>,
}

impl StateConfig {
    pub fn new(schema: Schema) -> StateConfig {
        StateConfig {
            schema,
            doc: None,
            selection: None,
            stored_marks: None,
            plugins: Vec::new(),
        }
    }

    pub fn with_doc(mut self, doc: Node) -> StateConfig {
        self.doc = Some(doc);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> StateConfig {
        self.selection = Some(selection);
        self
    }

    pub fn with_stored_marks(mut self, marks: Vec<Mark>) -> StateConfig {
        self.stored_marks = Some(marks);
        self
    }

    pub fn with_plugins(mut self, plugins: Vec<Arc<Plugin>>) -> StateConfig {
        self.plugins = plugins;
        self
    }
}

/// One slot in a configuration's ordered field list. Order is part of the
/// contract: a field's `init`/`apply` may read earlier fields' final
/// values for the revision being built, never later ones.
pub(crate) enum Field {
    Doc,
    Selection,
    StoredMarks,
    ScrollToSelection,
    Plugin { plugin: Arc<Plugin>, slot: usize },
}

/// The full ordered field layout derived from a schema and a plugin list:
/// the four built-in fields followed by one field per state-declaring
/// plugin, plus a key-to-plugin lookup. Built once and shared by reference
/// by every state derived from it until a reconfiguration replaces it.
pub struct Configuration {
    schema: Schema,
    plugins: Vec<Arc<Plugin>>,
    plugins_by_key: HashMap<String, Arc<Plugin>>,
    slots_by_key: HashMap<String, usize>,
    fields: Vec<Field>,
    plugin_field_count: usize,
}

impl Configuration {
    pub(crate) fn new(
        schema: Schema,
        plugins: Vec<Arc<Plugin>>,
    ) -> Result<Arc<Configuration>, StateError> {
        let mut fields = vec![
            Field::Doc,
            Field::Selection,
            Field::StoredMarks,
            Field::ScrollToSelection,
        ];
        let mut plugins_by_key = HashMap::new();
        let mut slots_by_key = HashMap::new();
        let mut slot = 0;
        for plugin in &plugins {
            if plugins_by_key
                .insert(plugin.key().to_string(), plugin.clone())
                .is_some()
            {
                return Err(StateError::DuplicatePluginKey(plugin.key().to_string()));
            }
            if plugin.spec().state.is_some() {
                slots_by_key.insert(plugin.key().to_string(), slot);
                fields.push(Field::Plugin {
                    plugin: plugin.clone(),
                    slot,
                });
                slot += 1;
            }
        }
        Ok(Arc::new(Configuration {
            schema,
            plugins,
            plugins_by_key,
            slots_by_key,
            fields,
            plugin_field_count: slot,
        }))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn plugins(&self) -> &[Arc<Plugin>] {
        &self.plugins
    }

    pub fn plugin_by_key(&self, key: &str) -> Option<&Arc<Plugin>> {
        self.plugins_by_key.get(key)
    }

    pub(crate) fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Index of a plugin's field slot, when that plugin declares state.
    pub(crate) fn plugin_slot(&self, key: &str) -> Option<usize> {
        self.slots_by_key.get(key).copied()
    }

    pub(crate) fn plugin_field_count(&self) -> usize {
        self.plugin_field_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{KeyRegistry, PluginSpec};
    use textloom_model::{ContentKind, NodeTypeSpec, SchemaSpec};

    fn schema() -> Schema {
        Schema::new(SchemaSpec {
            nodes: vec![
                NodeTypeSpec::block("doc", ContentKind::Block),
                NodeTypeSpec::block("paragraph", ContentKind::Inline),
                NodeTypeSpec::text(),
            ],
            marks: vec![],
            top_node: Some("doc".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_duplicate_plugin_key_fails() {
        let mut keys = KeyRegistry::new();
        let key = keys.mint("dup");
        let a = Plugin::new(
            PluginSpec {
                key: Some(key.clone()),
                ..PluginSpec::default()
            },
            &mut keys,
        );
        let b = Plugin::new(
            PluginSpec {
                key: Some(key),
                ..PluginSpec::default()
            },
            &mut keys,
        );
        let result = Configuration::new(schema(), vec![a, b]);
        assert!(matches!(result, Err(StateError::DuplicatePluginKey(_))));
    }

    #[test]
    fn test_plugin_lookup_by_key() {
        let mut keys = KeyRegistry::new();
        let key = keys.mint("lookup");
        let plugin = Plugin::new(
            PluginSpec {
                key: Some(key.clone()),
                ..PluginSpec::default()
            },
            &mut keys,
        );
        let config = Configuration::new(schema(), vec![plugin.clone()]).unwrap();
        assert!(Arc::ptr_eq(
            config.plugin_by_key(key.id()).unwrap(),
            &plugin
        ));
        assert!(config.plugin_by_key("absent$").is_none());
    }
}
