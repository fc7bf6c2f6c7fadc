//! Inline annotations attached to text.
//!
//! Mark sets are plain `Vec<Mark>`s kept sorted by mark-type declaration
//! rank, holding at most one mark per type; adding a mark of a type already
//! in the set replaces the previous instance.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::schema::Schema;

#[derive(Debug)]
struct MarkTypeData {
    name: String,
    rank: usize,
}

/// A mark type, shared by every mark of that type.
#[derive(Clone)]
pub struct MarkType(Arc<MarkTypeData>);

impl MarkType {
    pub(crate) fn new(name: String, rank: usize) -> Self {
        MarkType(Arc::new(MarkTypeData { name, rank }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub(crate) fn rank(&self) -> usize {
        self.0.rank
    }

    pub fn create(&self) -> Mark {
        self.create_with_attrs(Map::new())
    }

    pub fn create_with_attrs(&self, attrs: Map<String, Value>) -> Mark {
        Mark(Arc::new(MarkData {
            mark_type: self.clone(),
            attrs,
        }))
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.0.name)
    }
}

#[derive(Debug)]
struct MarkData {
    mark_type: MarkType,
    attrs: Map<String, Value>,
}

/// An inline annotation (emphasis, a link, ...) attached to text.
#[derive(Clone)]
pub struct Mark(Arc<MarkData>);

impl Mark {
    pub fn mark_type(&self) -> &MarkType {
        &self.0.mark_type
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.0.attrs
    }

    /// Add this mark to a sorted set, replacing any existing mark of the
    /// same type.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut out: Vec<Mark> = Vec::with_capacity(set.len() + 1);
        let mut placed = false;
        for mark in set {
            if mark == self {
                return set.to_vec();
            }
            if mark.mark_type() == self.mark_type() {
                continue;
            }
            if !placed && mark.mark_type().rank() > self.mark_type().rank() {
                out.push(self.clone());
                placed = true;
            }
            out.push(mark.clone());
        }
        if !placed {
            out.push(self.clone());
        }
        out
    }

    /// Remove every mark of this mark's type from the set.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter()
            .filter(|m| m.mark_type() != self.mark_type())
            .cloned()
            .collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|m| m == self)
    }

    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a == b
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "type".to_string(),
            Value::String(self.mark_type().name().to_string()),
        );
        if !self.attrs().is_empty() {
            obj.insert("attrs".to_string(), Value::Object(self.attrs().clone()));
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Mark, ModelError> {
        let obj = json
            .as_object()
            .ok_or_else(|| ModelError::bad_json("mark", "expected an object"))?;
        let name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::bad_json("mark", "missing type"))?;
        let mark_type = schema.mark_type(name)?;
        match obj.get("attrs") {
            Some(Value::Object(attrs)) => Ok(mark_type.create_with_attrs(attrs.clone())),
            Some(_) => Err(ModelError::bad_json("mark", "attrs must be an object")),
            None => Ok(mark_type.create()),
        }
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.mark_type() == other.mark_type() && self.attrs() == other.attrs())
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs().is_empty() {
            write!(f, "Mark({})", self.mark_type().name())
        } else {
            write!(
                f,
                "Mark({} {})",
                self.mark_type().name(),
                Value::Object(self.attrs().clone())
            )
        }
    }
}
