use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("position {0} is outside the document")]
    PositionOutOfRange(usize),
    #[error("inserted content is deeper than the insertion position")]
    SliceTooDeep,
    #[error("inconsistent open depths: {from_depth} - {open_start} vs {to_depth} - {open_end}")]
    InconsistentOpenDepths {
        from_depth: usize,
        open_start: usize,
        to_depth: usize,
        open_end: usize,
    },
    #[error("cannot join {child} onto {parent}")]
    CannotJoin { parent: String, child: String },
    #[error("invalid content for node type {0}")]
    InvalidContent(String),
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),
    #[error("unknown mark type: {0}")]
    UnknownMarkType(String),
    #[error("duplicate type name in schema: {0}")]
    DuplicateTypeName(String),
    #[error("schema has no node type named {0} to use as top node")]
    MissingTopNode(String),
    #[error("malformed {what} JSON: {detail}")]
    MalformedJson { what: &'static str, detail: String },
}

impl ModelError {
    pub(crate) fn bad_json(what: &'static str, detail: impl Into<String>) -> Self {
        ModelError::MalformedJson {
            what,
            detail: detail.into(),
        }
    }
}
