//! Custom selection variants.
//!
//! External code can define its own selection behavior by implementing
//! [`SelectionDelegate`] and, for JSON round-tripping, registering a
//! decoder under the variant's id with [`register_selection_variant`].
//! The registry is id-keyed and process-wide; registering the same id
//! twice fails, as does shadowing a built-in id.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock};

use serde_json::Value;
use textloom_model::{Node, ResolvedPos};
use textloom_transform::Mapping;

use crate::error::StateError;
use crate::selection::{Selection, SelectionBookmark, SelectionRange};

/// Variant-specific behavior of a custom selection. Every hook receives
/// the selection it belongs to explicitly.
pub trait SelectionDelegate: fmt::Debug + Send + Sync {
    /// The JSON `type` tag of this variant.
    fn json_id(&self) -> &str;

    /// Re-derive the selection after a mapping. Implementations should
    /// degrade gracefully (typically via [`Selection::near`]) when the
    /// selected content no longer exists.
    fn map(&self, doc: &Node, mapping: &Mapping, sel: &CustomSelection) -> Selection;

    fn to_json(&self, sel: &CustomSelection) -> Value;

    fn eq(&self, sel: &CustomSelection, other: &Selection) -> bool {
        match other {
            Selection::Custom(other) => {
                self.json_id() == other.delegate().json_id()
                    && sel.resolved_anchor().pos() == other.resolved_anchor().pos()
                    && sel.resolved_head().pos() == other.resolved_head().pos()
            }
            _ => false,
        }
    }

    fn bookmark(&self, sel: &CustomSelection) -> SelectionBookmark {
        SelectionBookmark::Text {
            anchor: sel.resolved_anchor().pos(),
            head: sel.resolved_head().pos(),
        }
    }

    fn visible(&self) -> bool {
        true
    }
}

/// A selection whose behavior lives in a [`SelectionDelegate`]. Custom
/// variants may supply explicit ranges; otherwise the single
/// anchor-to-head range applies.
#[derive(Clone)]
pub struct CustomSelection {
    anchor: ResolvedPos,
    head: ResolvedPos,
    ranges: Option<Vec<SelectionRange>>,
    delegate: Arc<dyn SelectionDelegate>,
}

impl CustomSelection {
    pub fn new(
        anchor: ResolvedPos,
        head: ResolvedPos,
        ranges: Option<Vec<SelectionRange>>,
        delegate: Arc<dyn SelectionDelegate>,
    ) -> CustomSelection {
        CustomSelection {
            anchor,
            head,
            ranges,
            delegate,
        }
    }

    pub fn resolved_anchor(&self) -> &ResolvedPos {
        &self.anchor
    }

    pub fn resolved_head(&self) -> &ResolvedPos {
        &self.head
    }

    pub fn explicit_ranges(&self) -> Option<&[SelectionRange]> {
        self.ranges.as_deref()
    }

    pub fn delegate(&self) -> &Arc<dyn SelectionDelegate> {
        &self.delegate
    }
}

impl fmt::Debug for CustomSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomSelection")
            .field("type", &self.delegate.json_id())
            .field("anchor", &self.anchor.pos())
            .field("head", &self.head.pos())
            .finish()
    }
}

/// Decoder for one registered selection variant.
pub type SelectionDecoder =
    Arc<dyn Fn(&Node, &Value) -> Result<Selection, StateError> + Send + Sync>;

static VARIANTS: LazyLock<RwLock<HashMap<String, SelectionDecoder>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

const BUILTIN_IDS: [&str; 3] = ["text", "node", "all"];

/// Register a JSON decoder for a custom selection variant. Fails when the
/// id is already taken (including the built-in ids).
pub fn register_selection_variant(
    id: &str,
    decode: SelectionDecoder,
) -> Result<(), StateError> {
    if BUILTIN_IDS.contains(&id) {
        return Err(StateError::DuplicateSelectionVariant(id.to_string()));
    }
    let mut variants = VARIANTS.write().expect("selection registry lock");
    if variants.contains_key(id) {
        return Err(StateError::DuplicateSelectionVariant(id.to_string()));
    }
    variants.insert(id.to_string(), decode);
    Ok(())
}

pub(crate) fn decoder(id: &str) -> Option<SelectionDecoder> {
    VARIANTS
        .read()
        .expect("selection registry lock")
        .get(id)
        .cloned()
}
