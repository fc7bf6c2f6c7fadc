//! Extension descriptors.
//!
//! A [`Plugin`] bundles an optional state field, transaction hooks and
//! view-facing props under a unique string key. Plugins are immutable
//! after construction and shared by `Arc`; every hook receives its context
//! explicitly (the plugin itself first, where a hook may need it), so
//! nothing depends on an implicit receiver.
//!
//! Key uniqueness comes from an explicit [`KeyRegistry`] value rather than
//! process-global state: minting is a pure function of the registry passed
//! in, so tests and embedders control key scoping themselves.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::StateConfig;
use crate::state::{EditorState, PartialState};
use crate::transaction::Transaction;

/// A plugin field value. Fields are stored type-erased and shared between
/// states; plugins downcast to their own concrete type on read.
pub type FieldValue = Arc<dyn Any + Send + Sync>;

/// Veto hook: return `false` to reject a transaction outright.
pub type FilterFn = Arc<dyn Fn(&Plugin, &Transaction, &EditorState) -> bool + Send + Sync>;

/// Reaction hook: offered the transactions this plugin has not yet seen,
/// the state before them and the state after them; may produce one
/// follow-up transaction built from the new state.
pub type AppendFn =
    Arc<dyn Fn(&Plugin, &[Transaction], &EditorState, &EditorState) -> Option<Transaction> + Send + Sync>;

/// A view prop computed against a state.
pub type PropFn = Arc<dyn Fn(&Plugin, &EditorState) -> Value + Send + Sync>;

/// A DOM event handler prop; returns `true` when the event was handled.
pub type DomEventFn = Arc<dyn Fn(&Plugin, &EditorState, &Value) -> bool + Send + Sync>;

/// The lifecycle of one plugin state field.
pub trait StateField: Send + Sync {
    /// Compute the field's initial value. `state` exposes the built-in
    /// fields and the fields of earlier-declared plugins at their final
    /// values; later-declared fields are absent.
    fn init(&self, config: &StateConfig, state: &PartialState<'_>) -> FieldValue;

    /// Compute the field's next value for a transaction, under the same
    /// partial-visibility rule as `init`.
    fn apply(
        &self,
        tr: &Transaction,
        value: &FieldValue,
        old_state: &EditorState,
        new_state: &PartialState<'_>,
    ) -> FieldValue;

    /// Serialize the field, or `None` when this field does not serialize.
    fn to_json(&self, _value: &FieldValue) -> Option<Value> {
        None
    }

    /// Deserialize the field, or `None` to fall back to `init`.
    fn from_json(
        &self,
        _config: &StateConfig,
        _json: &Value,
        _state: &PartialState<'_>,
    ) -> Option<FieldValue> {
        None
    }
}

/// View-facing properties, carried for the (external) view layer; the
/// state core itself never calls them.
#[derive(Default, Clone)]
pub struct PluginProps {
    /// Editor-wide attributes contributed by this plugin.
    pub attributes: Option<PropFn>,
    /// DOM event handlers by event name.
    pub handle_dom_events: HashMap<String, DomEventFn>,
}

/// Everything a plugin declares. All parts are optional.
#[derive(Default)]
pub struct PluginSpec {
    /// Identity of this plugin. Anonymous plugins get a key minted from
    /// the base name `plugin` at construction.
    pub key: Option<PluginKey>,
    pub state: Option<Box<dyn StateField>>,
    pub props: PluginProps,
    pub filter_transaction: Option<FilterFn>,
    pub append_transaction: Option<AppendFn>,
}

/// An extension bound to a unique key.
pub struct Plugin {
    key: String,
    spec: PluginSpec,
}

impl Plugin {
    pub fn new(spec: PluginSpec, keys: &mut KeyRegistry) -> Arc<Plugin> {
        let key = match &spec.key {
            Some(key) => key.id().to_string(),
            None => keys.mint_raw("plugin"),
        };
        Arc::new(Plugin { key, spec })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn spec(&self) -> &PluginSpec {
        &self.spec
    }

    pub fn props(&self) -> &PluginProps {
        &self.spec.props
    }

    /// This plugin's state field value in a state, or `None` when the
    /// plugin is not active in that state's configuration.
    pub fn get_state<'a>(&self, state: &'a EditorState) -> Option<&'a FieldValue> {
        state.plugin_field(&self.key)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("key", &self.key).finish()
    }
}

/// A handle for addressing one plugin and its state inside states built
/// with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginKey {
    id: String,
}

impl PluginKey {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The plugin registered under this key in a state's configuration.
    pub fn get<'a>(&self, state: &'a EditorState) -> Option<&'a Arc<Plugin>> {
        state.config().plugin_by_key(&self.id)
    }

    /// The state field value of the plugin registered under this key.
    pub fn get_state<'a>(&self, state: &'a EditorState) -> Option<&'a FieldValue> {
        state.plugin_field(&self.id)
    }
}

/// Explicit mint state for plugin keys. The first key minted for a name is
/// `name$`; later mints for the same name append a counter (`name$1`,
/// `name$2`, ...), so independently-authored plugins never have to
/// coordinate names.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    counters: HashMap<String, u64>,
}

impl KeyRegistry {
    pub fn new() -> KeyRegistry {
        KeyRegistry::default()
    }

    pub fn mint(&mut self, name: &str) -> PluginKey {
        PluginKey {
            id: self.mint_raw(name),
        }
    }

    pub(crate) fn mint_raw(&mut self, name: &str) -> String {
        match self.counters.get_mut(name) {
            Some(count) => {
                *count += 1;
                format!("{name}${count}")
            }
            None => {
                self.counters.insert(name.to_string(), 0);
                format!("{name}$")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_first_key_has_no_counter() {
        let mut keys = KeyRegistry::new();
        assert_eq!(keys.mint("history").id(), "history$");
    }

    #[test]
    fn test_mint_same_name_counts_up() {
        let mut keys = KeyRegistry::new();
        keys.mint("history");
        assert_eq!(keys.mint("history").id(), "history$1");
        assert_eq!(keys.mint("history").id(), "history$2");
    }

    #[test]
    fn test_mint_different_names_are_independent() {
        let mut keys = KeyRegistry::new();
        keys.mint("history");
        assert_eq!(keys.mint("cursor").id(), "cursor$");
    }

    #[test]
    fn test_separate_registries_do_not_leak() {
        let mut a = KeyRegistry::new();
        let mut b = KeyRegistry::new();
        a.mint("history");
        assert_eq!(b.mint("history").id(), "history$");
    }

    #[test]
    fn test_anonymous_plugin_gets_plugin_key() {
        let mut keys = KeyRegistry::new();
        let first = Plugin::new(PluginSpec::default(), &mut keys);
        let second = Plugin::new(PluginSpec::default(), &mut keys);
        assert_eq!(first.key(), "plugin$");
        assert_eq!(second.key(), "plugin$1");
    }

    #[test]
    fn test_keyed_plugin_uses_its_key() {
        let mut keys = KeyRegistry::new();
        let key = keys.mint("history");
        let plugin = Plugin::new(
            PluginSpec {
                key: Some(key.clone()),
                ..PluginSpec::default()
            },
            &mut keys,
        );
        assert_eq!(plugin.key(), key.id());
    }
}
