//! # Graph Store Trait
//!
//! The contract between the mapper and any graph store. The unit of work
//! only ever speaks in store field names and [`Record`]s; it knows nothing
//! about the transport behind this trait.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory, for testing/embedding |

pub mod memory;

use serde::Deserialize;

use crate::element::{ElementId, ElementKind, PropertyMap, Record, Value};
use crate::{Error, Result};

pub use memory::MemoryStore;

// ============================================================================
// Store Configuration
// ============================================================================

/// Which store an `Ogm` opens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory (no persistence)
    #[default]
    Memory,
}

// ============================================================================
// Query
// ============================================================================

/// Lookup over one element kind: an optional index key, equality filters
/// and an offset/limit window. Keys are store field names; the window
/// applies to matches in id order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub on: ElementKind,
    pub index: Option<(String, Value)>,
    pub filters: Vec<(String, Value)>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn vertices() -> Self {
        Self { on: ElementKind::Vertex, index: None, filters: Vec::new(), offset: None, limit: None }
    }

    pub fn edges() -> Self {
        Self { on: ElementKind::Edge, ..Self::vertices() }
    }

    /// Index to start the lookup from.
    pub fn on_index(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.index = Some((key.into(), value.into()));
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Matches to skip before the limit applies. Zero clears the offset.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = (offset > 0).then_some(offset);
        self
    }

    /// Whether `record` satisfies the index key and every filter.
    pub fn matches(&self, record: &Record) -> bool {
        record.kind() == self.on
            && self
                .index
                .iter()
                .chain(&self.filters)
                .all(|(key, value)| record.get(key) == Some(value))
    }
}

// ============================================================================
// GraphStore Trait
// ============================================================================

/// The store contract.
///
/// Every call blocks until the store answers. Failures are opaque
/// `Error::Store` values; the mapper never retries.
pub trait GraphStore: Send + Sync {
    fn get_vertex(&self, id: ElementId) -> Result<Option<Record>>;

    /// Creates a vertex and returns it with its assigned id.
    fn create_vertex(&self, fields: PropertyMap) -> Result<Record>;

    /// Merges `fields` into an existing vertex.
    fn update_vertex(&self, id: ElementId, fields: PropertyMap) -> Result<()>;

    fn delete_vertex(&self, id: ElementId) -> Result<()>;

    fn get_edge(&self, id: ElementId) -> Result<Option<Record>>;

    /// Creates an edge `out_id -[label]-> in_id`.
    fn create_edge(
        &self,
        out_id: ElementId,
        label: &str,
        in_id: ElementId,
        fields: PropertyMap,
    ) -> Result<Record>;

    fn update_edge(&self, id: ElementId, fields: PropertyMap) -> Result<()>;

    fn delete_edge(&self, id: ElementId) -> Result<()>;

    /// Index/filter lookup. Stores without query support keep the default.
    fn query(&self, _query: &Query) -> Result<Vec<Record>> {
        Err(Error::Store("queries not supported by this store".into()))
    }
}
