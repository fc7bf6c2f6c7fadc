//! Reversible document edits for textloom.
//!
//! Edits are [`Step`] values: atomic, invertible, and each producing a
//! [`StepMap`] describing how it moves positions. A [`Transform`]
//! accumulates steps against a starting document, keeping the document
//! after every step and a cumulative [`Mapping`] from start positions to
//! current positions.

pub mod error;
pub mod map;
pub mod step;
pub mod transform;

pub use error::TransformError;
pub use map::{MapResult, Mapping, StepMap};
pub use step::{AddMarkStep, RemoveMarkStep, ReplaceStep, Step};
pub use transform::Transform;
