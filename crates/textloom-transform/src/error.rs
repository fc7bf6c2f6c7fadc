use textloom_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("step failed to apply: {0}")]
    Apply(#[from] ModelError),
    #[error("invalid step range: {from}..{to}")]
    BadRange { from: usize, to: usize },
}
