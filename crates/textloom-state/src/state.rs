//! The immutable editor state and the transaction pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use textloom_model::{Mark, Node, Schema};
use tracing::{debug, trace};

use crate::config::{Configuration, Field, StateConfig};
use crate::error::StateError;
use crate::plugin::{FieldValue, Plugin, PluginKey};
use crate::selection::Selection;
use crate::transaction::{APPENDED_TRANSACTION, Transaction};

/// The outcome of the transaction pipeline: the resulting state and every
/// transaction that was folded into it (the root plus any appended by
/// plugins), in application order. Empty when the root was vetoed.
pub struct ApplyResult {
    pub state: EditorState,
    pub transactions: Vec<Transaction>,
}

/// View of a state while its fields are being computed. Built-in fields
/// and the fields of earlier-declared plugins are at their final values
/// for the revision being built; later-declared fields are absent, so a
/// plugin can derive its state from an earlier plugin's but never from a
/// later one.
pub struct PartialState<'a> {
    config: &'a Configuration,
    doc: &'a Node,
    selection: &'a Selection,
    stored_marks: &'a Option<Vec<Mark>>,
    scroll_to_selection: u64,
    plugin_fields: &'a [FieldValue],
}

impl PartialState<'_> {
    pub fn doc(&self) -> &Node {
        self.doc
    }

    pub fn selection(&self) -> &Selection {
        self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn scroll_to_selection(&self) -> u64 {
        self.scroll_to_selection
    }

    /// The field value of the plugin registered under `key`, or `None`
    /// when that plugin declares no state or is declared later than the
    /// field being computed.
    pub fn plugin_field(&self, key: &PluginKey) -> Option<&FieldValue> {
        let slot = self.config.plugin_slot(key.id())?;
        self.plugin_fields.get(slot)
    }
}

/// An immutable snapshot of everything that makes up the editor's state:
/// the document, the selection, stored marks, the scroll counter, and one
/// slot per plugin field. Only [`EditorState::apply_transaction`] (or its
/// wrappers) produces the next snapshot.
#[derive(Clone)]
pub struct EditorState {
    config: Arc<Configuration>,
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
    /// Bumped each time a transaction asks for the selection to be
    /// scrolled into view; the (external) view watches the edges.
    scroll_to_selection: u64,
    plugin_fields: Vec<FieldValue>,
}

impl EditorState {
    /// Build a fresh state. The document defaults to the schema's empty
    /// document, the selection to the valid selection nearest its start.
    /// Fails when two plugins share a key.
    pub fn create(config: StateConfig) -> Result<EditorState, StateError> {
        let configuration = Configuration::new(config.schema.clone(), config.plugins.clone())?;
        let doc = match &config.doc {
            Some(doc) => doc.clone(),
            None => config.schema.empty_document(),
        };
        let selection = match &config.selection {
            Some(selection) => selection.clone(),
            None => Selection::at_start(&doc),
        };
        let stored_marks = config.stored_marks.clone();

        let mut plugin_fields = Vec::with_capacity(configuration.plugin_field_count());
        for field in configuration.fields() {
            if let Field::Plugin { plugin, .. } = field {
                let value = {
                    let partial = PartialState {
                        config: &configuration,
                        doc: &doc,
                        selection: &selection,
                        stored_marks: &stored_marks,
                        scroll_to_selection: 0,
                        plugin_fields: &plugin_fields,
                    };
                    plugin
                        .spec()
                        .state
                        .as_ref()
                        .expect("plugin fields come from state-declaring plugins")
                        .init(&config, &partial)
                };
                plugin_fields.push(value);
            }
        }

        Ok(EditorState {
            config: configuration,
            doc,
            selection,
            stored_marks,
            scroll_to_selection: 0,
            plugin_fields,
        })
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn scroll_to_selection(&self) -> u64 {
        self.scroll_to_selection
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        self.config.schema()
    }

    pub fn plugins(&self) -> &[Arc<Plugin>] {
        self.config.plugins()
    }

    pub(crate) fn plugin_field(&self, key: &str) -> Option<&FieldValue> {
        let slot = self.config.plugin_slot(key)?;
        self.plugin_fields.get(slot)
    }

    /// Start a transaction from this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(self)
    }

    /// Run the pipeline for a transaction and return the resulting state.
    pub fn apply(&self, tr: Transaction) -> Result<EditorState, StateError> {
        Ok(self.apply_transaction(tr)?.state)
    }

    /// Apply a single transaction to this state, without consulting
    /// plugins. Fails when the transaction was not built from this
    /// state's current document revision.
    pub fn apply_inner(&self, tr: &Transaction) -> Result<EditorState, StateError> {
        if tr.before() != &self.doc {
            return Err(StateError::MismatchedTransaction);
        }
        let doc = tr.doc().clone();
        let selection = tr.selection();
        let stored_marks = if selection.text_cursor().is_some() {
            tr.stored_marks().map(<[Mark]>::to_vec)
        } else {
            None
        };
        let scroll_to_selection = if tr.scrolled_into_view() {
            self.scroll_to_selection + 1
        } else {
            self.scroll_to_selection
        };

        let mut plugin_fields = Vec::with_capacity(self.plugin_fields.len());
        for field in self.config.fields() {
            if let Field::Plugin { plugin, slot } = field {
                let value = {
                    let partial = PartialState {
                        config: &self.config,
                        doc: &doc,
                        selection: &selection,
                        stored_marks: &stored_marks,
                        scroll_to_selection,
                        plugin_fields: &plugin_fields,
                    };
                    plugin
                        .spec()
                        .state
                        .as_ref()
                        .expect("plugin fields come from state-declaring plugins")
                        .apply(tr, &self.plugin_fields[*slot], self, &partial)
                };
                plugin_fields.push(value);
            }
        }

        Ok(EditorState {
            config: self.config.clone(),
            doc,
            selection,
            stored_marks,
            scroll_to_selection,
            plugin_fields,
        })
    }

    /// Ask every plugin that declares a filter whether it accepts the
    /// transaction. `ignore` excludes one plugin (used so a plugin cannot
    /// veto its own appended transaction).
    fn filter_transaction(&self, tr: &Transaction, ignore: Option<usize>) -> bool {
        for (index, plugin) in self.config.plugins().iter().enumerate() {
            if Some(index) == ignore {
                continue;
            }
            if let Some(filter) = &plugin.spec().filter_transaction
                && !filter(plugin, tr, self)
            {
                return false;
            }
        }
        true
    }

    /// The transaction pipeline.
    ///
    /// 1. Every plugin may veto the root transaction; a veto aborts the
    ///    whole application with no effect.
    /// 2. The root is applied.
    /// 3. Fixpoint expansion: in declaration order, each plugin that
    ///    declares `append_transaction` is offered exactly the
    ///    transactions it has not yet seen, together with the state it
    ///    last saw and the current state. A produced transaction is
    ///    filtered by every *other* plugin, tagged with the root's id
    ///    under the `appendedTransaction` meta key, and folded in. The
    ///    loop ends when a full pass produces nothing new.
    ///
    /// Each plugin reacts exactly once to each transaction; the per-plugin
    /// bookkeeping is updated after every offer, produced or not. A plugin
    /// that always appends causes non-termination — the per-pass trace
    /// event is the diagnostic for that.
    pub fn apply_transaction(&self, root: Transaction) -> Result<ApplyResult, StateError> {
        if !self.filter_transaction(&root, None) {
            debug!(id = %root.id(), "transaction vetoed by filter");
            return Ok(ApplyResult {
                state: self.clone(),
                transactions: Vec::new(),
            });
        }

        let root_id = root.id();
        let mut new_state = self.apply_inner(&root)?;
        let mut trs = vec![root];
        // per-plugin: the state it last saw and how many of `trs` it has
        // been shown
        let mut seen: Vec<(EditorState, usize)> = self
            .config
            .plugins()
            .iter()
            .map(|_| (self.clone(), 0))
            .collect();

        let mut pass = 0usize;
        loop {
            let mut have_new = false;
            for index in 0..self.config.plugins().len() {
                let plugin = self.config.plugins()[index].clone();
                let Some(append) = plugin.spec().append_transaction.clone() else {
                    continue;
                };
                let (old_state, shown) = {
                    let entry = &seen[index];
                    (entry.0.clone(), entry.1)
                };
                if shown < trs.len()
                    && let Some(mut tr) = append(&plugin, &trs[shown..], &old_state, &new_state)
                    && new_state.filter_transaction(&tr, Some(index))
                {
                    tr.set_meta(APPENDED_TRANSACTION, root_id);
                    new_state = new_state.apply_inner(&tr)?;
                    trs.push(tr);
                    have_new = true;
                }
                seen[index] = (new_state.clone(), trs.len());
            }
            if !have_new {
                debug!(
                    passes = pass + 1,
                    transactions = trs.len(),
                    "transaction pipeline reached fixpoint"
                );
                return Ok(ApplyResult {
                    state: new_state,
                    transactions: trs,
                });
            }
            pass += 1;
            trace!(pass, transactions = trs.len(), "pipeline pass appended transactions");
        }
    }

    /// Build a state with a new configuration. Field values present in
    /// both configurations (including the built-ins) carry over unchanged;
    /// fields new to the configuration are initialized; fields absent from
    /// it are dropped. No revalidation of doc or selection is performed —
    /// the schema must stay representation-compatible.
    pub fn reconfigure(&self, config: ReconfigureConfig) -> Result<EditorState, StateError> {
        let schema = config
            .schema
            .unwrap_or_else(|| self.config.schema().clone());
        let configuration = Configuration::new(schema.clone(), config.plugins)?;
        debug!(plugins = configuration.plugins().len(), "reconfiguring state");

        let init_config = StateConfig::new(schema);
        let mut plugin_fields = Vec::with_capacity(configuration.plugin_field_count());
        for field in configuration.fields() {
            if let Field::Plugin { plugin, .. } = field {
                let value = match self.config.plugin_slot(plugin.key()) {
                    Some(old_slot) => self.plugin_fields[old_slot].clone(),
                    None => {
                        let partial = PartialState {
                            config: &configuration,
                            doc: &self.doc,
                            selection: &self.selection,
                            stored_marks: &self.stored_marks,
                            scroll_to_selection: self.scroll_to_selection,
                            plugin_fields: &plugin_fields,
                        };
                        plugin
                            .spec()
                            .state
                            .as_ref()
                            .expect("plugin fields come from state-declaring plugins")
                            .init(&init_config, &partial)
                    }
                };
                plugin_fields.push(value);
            }
        }

        Ok(EditorState {
            config: configuration,
            doc: self.doc.clone(),
            selection: self.selection.clone(),
            stored_marks: self.stored_marks.clone(),
            scroll_to_selection: self.scroll_to_selection,
            plugin_fields,
        })
    }

    /// Serialize the built-in fields.
    pub fn to_json(&self) -> Value {
        self.to_json_with_plugins(&[])
            .expect("serialization without plugin fields cannot fail")
    }

    /// Serialize the built-in fields plus, for each `(output key, plugin)`
    /// pair whose plugin serializes its state, that plugin's field. Fails
    /// when an output key collides with the reserved `doc`/`selection`
    /// keys.
    pub fn to_json_with_plugins(
        &self,
        plugin_fields: &[(String, Arc<Plugin>)],
    ) -> Result<Value, StateError> {
        let mut obj = Map::new();
        obj.insert("doc".to_string(), self.doc.to_json());
        obj.insert("selection".to_string(), self.selection.to_json());
        if let Some(marks) = &self.stored_marks {
            obj.insert(
                "storedMarks".to_string(),
                Value::Array(marks.iter().map(Mark::to_json).collect()),
            );
        }
        for (key, plugin) in plugin_fields {
            if key == "doc" || key == "selection" {
                return Err(StateError::ReservedJsonKey(key.clone()));
            }
            if let Some(state_field) = &plugin.spec().state
                && let Some(value) = plugin.get_state(self)
                && let Some(json) = state_field.to_json(value)
            {
                obj.insert(key.clone(), json);
            }
        }
        Ok(Value::Object(obj))
    }

    /// Deserialize a state. The built-in fields come from the JSON; each
    /// plugin field comes from the plugin's own deserializer when the
    /// caller supplied a matching `(input key, plugin)` pair and the JSON
    /// contains that key, and from the plugin's `init` otherwise.
    pub fn from_json(
        config: StateConfig,
        json: &Value,
        plugin_fields: &[(String, Arc<Plugin>)],
    ) -> Result<EditorState, StateError> {
        let obj = json
            .as_object()
            .ok_or_else(|| StateError::bad_json("state", "expected an object"))?;
        let configuration = Configuration::new(config.schema.clone(), config.plugins.clone())?;

        let doc_json = obj
            .get("doc")
            .ok_or_else(|| StateError::bad_json("state", "missing doc"))?;
        let doc = Node::from_json(&config.schema, doc_json)?;
        let selection_json = obj
            .get("selection")
            .ok_or_else(|| StateError::bad_json("state", "missing selection"))?;
        let selection = Selection::from_json(&doc, selection_json)?;
        let stored_marks = match obj.get("storedMarks") {
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| Mark::from_json(&config.schema, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => {
                return Err(StateError::bad_json("state", "storedMarks must be an array"));
            }
            None => None,
        };

        let by_plugin_key: HashMap<&str, &String> = plugin_fields
            .iter()
            .map(|(key, plugin)| (plugin.key(), key))
            .collect();

        let mut fields = Vec::with_capacity(configuration.plugin_field_count());
        for field in configuration.fields() {
            if let Field::Plugin { plugin, .. } = field {
                let state_field = plugin
                    .spec()
                    .state
                    .as_ref()
                    .expect("plugin fields come from state-declaring plugins");
                let value = {
                    let partial = PartialState {
                        config: &configuration,
                        doc: &doc,
                        selection: &selection,
                        stored_marks: &stored_marks,
                        scroll_to_selection: 0,
                        plugin_fields: &fields,
                    };
                    by_plugin_key
                        .get(plugin.key())
                        .and_then(|key| obj.get(*key))
                        .and_then(|field_json| {
                            state_field.from_json(&config, field_json, &partial)
                        })
                        .unwrap_or_else(|| state_field.init(&config, &partial))
                };
                fields.push(value);
            }
        }

        Ok(EditorState {
            config: configuration,
            doc,
            selection,
            stored_marks,
            scroll_to_selection: 0,
            plugin_fields: fields,
        })
    }
}

/// Input for [`EditorState::reconfigure`]: an optional replacement schema
/// and the new plugin list.
pub struct ReconfigureConfig {
    pub schema: Option<Schema>,
    pub plugins: Vec<Arc<Plugin>>,
}

impl ReconfigureConfig {
    pub fn with_plugins(plugins: Vec<Arc<Plugin>>) -> ReconfigureConfig {
        ReconfigureConfig {
            schema: None,
            plugins,
        }
    }
}
