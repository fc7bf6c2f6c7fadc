use textloom_model::ModelError;
use textloom_transform::TransformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("two plugins share the key {0}")]
    DuplicatePluginKey(String),
    #[error("selection at {0} is not anchored to the transaction's document")]
    SelectionOutsideDocument(usize),
    #[error("applying a transaction built from a different document revision")]
    MismatchedTransaction,
    #[error("no selectable node at {0}")]
    NoNodeAt(usize),
    #[error("selection variant {0} is already registered")]
    DuplicateSelectionVariant(String),
    #[error("unknown selection type: {0}")]
    UnknownSelectionType(String),
    #[error("{0} is a reserved state JSON key")]
    ReservedJsonKey(String),
    #[error("malformed {what} JSON: {detail}")]
    MalformedJson { what: &'static str, detail: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl StateError {
    pub(crate) fn bad_json(what: &'static str, detail: impl Into<String>) -> Self {
        StateError::MalformedJson {
            what,
            detail: detail.into(),
        }
    }
}
