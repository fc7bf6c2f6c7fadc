//! Slices: fragments with open sides.

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::schema::Schema;

/// A piece of a document: a fragment plus the depths to which its start
/// and end are "open", i.e. cut through parent nodes that should be joined
/// onto matching nodes at the insertion point.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Slice {
        Slice {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Slice {
        Slice::new(Fragment::empty(), 0, 0)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// The size a replace with this slice adds to a document.
    pub fn size(&self) -> usize {
        self.content.size() - self.open_start - self.open_end
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("content".to_string(), self.content.to_json());
        if self.open_start > 0 {
            obj.insert("openStart".to_string(), Value::from(self.open_start));
        }
        if self.open_end > 0 {
            obj.insert("openEnd".to_string(), Value::from(self.open_end));
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Slice, ModelError> {
        let obj = json
            .as_object()
            .ok_or_else(|| ModelError::bad_json("slice", "expected an object"))?;
        let content = match obj.get("content") {
            Some(value) => Fragment::from_json(schema, value)?,
            None => Fragment::empty(),
        };
        let open = |key: &str| -> Result<usize, ModelError> {
            match obj.get(key) {
                Some(value) => value
                    .as_u64()
                    .map(|n| n as usize)
                    .ok_or_else(|| ModelError::bad_json("slice", "open depth must be a number")),
                None => Ok(0),
            }
        };
        Ok(Slice::new(content, open("openStart")?, open("openEnd")?))
    }
}
