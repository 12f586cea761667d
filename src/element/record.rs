//! Raw store element: what a `GraphStore` hands back.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use super::{PropertyMap, Value};

/// Reserved field carrying the store identifier in a raw record.
pub const ID_FIELD: &str = "_id";

/// Opaque store identifier. Unique across vertices and edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<ElementId> for Value {
    type Error = Error;

    /// Store integers are signed; ids past `i64::MAX` have no raw form.
    fn try_from(id: ElementId) -> Result<Self> {
        i64::try_from(id.0)
            .map(Value::Int)
            .map_err(|_| Error::Identity(format!("Element id {id} does not fit a store integer.")))
    }
}

impl ElementId {
    /// Read an identifier back out of a raw `_id` field.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_int() {
            Some(i) if i >= 0 => Some(ElementId(i as u64)),
            _ => None,
        }
    }
}

/// Which kind of graph element a record or query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Vertex,
    Edge,
}

/// A vertex or edge as stored: id, store-named fields, and for edges the
/// `(out, in)` endpoint ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: ElementId,
    pub fields: PropertyMap,
    pub endpoints: Option<(ElementId, ElementId)>,
}

impl Record {
    pub fn vertex(id: ElementId, fields: PropertyMap) -> Self {
        Self { id, fields, endpoints: None }
    }

    pub fn edge(id: ElementId, out_id: ElementId, in_id: ElementId, fields: PropertyMap) -> Self {
        Self { id, fields, endpoints: Some((out_id, in_id)) }
    }

    pub fn kind(&self) -> ElementKind {
        if self.endpoints.is_some() { ElementKind::Edge } else { ElementKind::Vertex }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The raw field map, with the identifier under `_id`.
    pub fn to_dict(&self) -> Result<PropertyMap> {
        let mut dict = self.fields.clone();
        dict.insert(ID_FIELD.to_string(), Value::try_from(self.id)?);
        Ok(dict)
    }
}
