//! In-memory graph store.
//!
//! This is the reference implementation of `GraphStore`.
//! It uses simple HashMaps protected by RwLock.
//!
//! ## Limitations
//!
//! - **No transactions**: every write is applied immediately.
//! - **Single-writer only**: Per-collection locks mean multi-step mutations
//!   are NOT atomic. Safe for single-threaded or read-heavy use only.
//! - **No property indexes**: `query()` does a full scan; the index key is
//!   just the first filter.
//!
//! Use this store for:
//! - Testing sessions, repositories and relation wiring
//! - Embedding the mapper in applications that don't need persistence

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;

use crate::element::{ElementId, ElementKind, PropertyMap, Record, Value};
use crate::{Error, Result};
use super::{GraphStore, Query};

/// Field an edge's label is stored under.
const LABEL_FIELD: &str = "label";

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory property graph store. Clones share the same graph.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    vertices: RwLock<HashMap<ElementId, PropertyMap>>,
    /// edge id → (out, in, fields)
    edges: RwLock<HashMap<ElementId, (ElementId, ElementId, PropertyMap)>>,
    /// vertex id → list of incident edge ids
    adjacency: RwLock<HashMap<ElementId, Vec<ElementId>>>,
    /// Shared by vertices and edges: ids are unique graph-wide.
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                vertices: RwLock::new(HashMap::new()),
                edges: RwLock::new(HashMap::new()),
                adjacency: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.vertices.read().len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edges.read().len()
    }

    fn next_id(&self) -> ElementId {
        ElementId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("vertices", &self.vertex_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

// ============================================================================
// GraphStore impl
// ============================================================================

impl GraphStore for MemoryStore {
    // ========================================================================
    // Vertex CRUD
    // ========================================================================

    fn get_vertex(&self, id: ElementId) -> Result<Option<Record>> {
        Ok(self.inner.vertices.read().get(&id).map(|fields| Record::vertex(id, fields.clone())))
    }

    fn create_vertex(&self, fields: PropertyMap) -> Result<Record> {
        let id = self.next_id();
        self.inner.vertices.write().insert(id, fields.clone());
        self.inner.adjacency.write().insert(id, Vec::new());
        Ok(Record::vertex(id, fields))
    }

    fn update_vertex(&self, id: ElementId, fields: PropertyMap) -> Result<()> {
        let mut vertices = self.inner.vertices.write();
        let vertex = vertices.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Vertex {id}")))?;
        vertex.extend(fields);
        Ok(())
    }

    fn delete_vertex(&self, id: ElementId) -> Result<()> {
        // A vertex cannot go while edges still point at it
        {
            let adj = self.inner.adjacency.read();
            if let Some(edges) = adj.get(&id) {
                if !edges.is_empty() {
                    return Err(Error::Store(format!(
                        "Cannot delete vertex {id} with {} edges. Delete edges first.",
                        edges.len(),
                    )));
                }
            }
        }

        self.inner
            .vertices
            .write()
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Vertex {id}")))?;
        self.inner.adjacency.write().remove(&id);
        Ok(())
    }

    // ========================================================================
    // Edge CRUD
    // ========================================================================

    fn get_edge(&self, id: ElementId) -> Result<Option<Record>> {
        Ok(self
            .inner
            .edges
            .read()
            .get(&id)
            .map(|(out_id, in_id, fields)| Record::edge(id, *out_id, *in_id, fields.clone())))
    }

    fn create_edge(
        &self,
        out_id: ElementId,
        label: &str,
        in_id: ElementId,
        mut fields: PropertyMap,
    ) -> Result<Record> {
        // Verify both vertices exist
        {
            let vertices = self.inner.vertices.read();
            if !vertices.contains_key(&out_id) {
                return Err(Error::NotFound(format!("Out vertex {out_id}")));
            }
            if !vertices.contains_key(&in_id) {
                return Err(Error::NotFound(format!("In vertex {in_id}")));
            }
        }

        let id = self.next_id();
        fields.insert(LABEL_FIELD.to_string(), Value::from(label));
        self.inner.edges.write().insert(id, (out_id, in_id, fields.clone()));

        // Update adjacency for both endpoints
        let mut adj = self.inner.adjacency.write();
        adj.entry(out_id).or_default().push(id);
        if out_id != in_id {
            adj.entry(in_id).or_default().push(id);
        }

        Ok(Record::edge(id, out_id, in_id, fields))
    }

    fn update_edge(&self, id: ElementId, fields: PropertyMap) -> Result<()> {
        let mut edges = self.inner.edges.write();
        let (_, _, edge) = edges.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Edge {id}")))?;
        edge.extend(fields);
        Ok(())
    }

    fn delete_edge(&self, id: ElementId) -> Result<()> {
        let (out_id, in_id, _) = self
            .inner
            .edges
            .write()
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Edge {id}")))?;
        let mut adj = self.inner.adjacency.write();
        for endpoint in [out_id, in_id] {
            if let Some(edges) = adj.get_mut(&endpoint) {
                edges.retain(|eid| *eid != id);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Query
    // ========================================================================

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = match query.on {
            ElementKind::Vertex => self
                .inner
                .vertices
                .read()
                .iter()
                .map(|(id, fields)| Record::vertex(*id, fields.clone()))
                .filter(|record| query.matches(record))
                .collect(),
            ElementKind::Edge => self
                .inner
                .edges
                .read()
                .iter()
                .map(|(id, (out_id, in_id, fields))| Record::edge(*id, *out_id, *in_id, fields.clone()))
                .filter(|record| query.matches(record))
                .collect(),
        };
        // HashMap order is arbitrary; hand records back in creation order.
        records.sort_by_key(|record| record.id);
        if let Some(offset) = query.offset {
            records.drain(..offset.min(records.len()));
        }
        if let Some(limit) = query.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}
