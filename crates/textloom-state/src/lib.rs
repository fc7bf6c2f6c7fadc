/*!
 * # Editor state core
 *
 * The state-transition engine of the textloom editor: an immutable
 * [`EditorState`] snapshot that only changes through discrete, inspectable
 * [`Transaction`]s, a [`Selection`] model that survives document mutation,
 * and a [`Plugin`] mechanism letting independently-authored extensions
 * attach typed sub-state that evolves in lock-step with the document.
 *
 * ## Architecture
 *
 * - **States are values.** An [`EditorState`] is never mutated; applying a
 *   transaction builds a fresh state with every field slot repopulated.
 *   States, selections, bookmarks and configurations are freely shareable.
 * - **Transactions are builders.** A [`Transaction`] starts from one state,
 *   accumulates document steps plus selection/stored-mark/metadata
 *   overrides, and is consumed (moved) when folded into the next state.
 * - **Plugins react through a fixpoint pipeline.** Applying a root
 *   transaction first offers every plugin a veto, then repeatedly offers
 *   every plugin the transactions it has not yet seen so it can append
 *   follow-up transactions, until a full pass produces nothing new. See
 *   [`EditorState::apply_transaction`].
 * - **Selections re-derive themselves.** After arbitrary edits a selection
 *   is re-resolved by searching the tree for the nearest valid cursor or
 *   node position ([`Selection::near`] never fails), and can be detached
 *   into a document-independent [`SelectionBookmark`] for deferred
 *   re-resolution.
 */

pub mod config;
pub mod error;
pub mod plugin;
pub mod selection;
pub mod state;
pub mod transaction;

pub use config::{Configuration, StateConfig};
pub use error::StateError;
pub use plugin::{
    AppendFn, FieldValue, FilterFn, KeyRegistry, Plugin, PluginKey, PluginProps, PluginSpec,
    StateField,
};
pub use selection::{
    AllSelection, BookmarkDelegate, CustomSelection, NodeSelection, Selection, SelectionBookmark,
    SelectionDecoder, SelectionDelegate, SelectionRange, TextSelection,
    register_selection_variant,
};
pub use state::{ApplyResult, EditorState, PartialState, ReconfigureConfig};
pub use transaction::{APPENDED_TRANSACTION, MetaKey, Transaction, TransactionId};
