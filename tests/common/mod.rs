//! Shared fixture: the Website / Page / hosts schema and a store that
//! records every call it receives.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use graph_ogm::element::props;
use graph_ogm::storage::{GraphStore, MemoryStore, Query};
use graph_ogm::{
    Adjacency, ElementId, Entity, EntityClass, Error, MetaData, PropertyMap, Property, Record,
    Result, ScalarType, SchemaBuilder, Session,
};

// ============================================================================
// Schema
// ============================================================================

pub fn website_class() -> EntityClass {
    EntityClass::new("Website")
}

pub fn page_class() -> EntityClass {
    EntityClass::new("Page")
}

pub fn hosts_class() -> EntityClass {
    EntityClass::with_defaults("WebsiteHostsPage", || props([("since", Utc::now())]))
}

pub fn metadata() -> Arc<MetaData> {
    let mut schema = SchemaBuilder::new();
    let website = schema
        .node("Website", [
            Property::new("name", ScalarType::string(127)).nullable(false).indexed(true),
            Property::new("domain", ScalarType::url(2801)),
            Property::new("description", ScalarType::string(1024)),
            Property::new("content", ScalarType::string(1024)),
        ])
        .unwrap();
    let page = schema
        .node("Page", [
            Property::new("title", ScalarType::string(127)).nullable(false),
            Property::new("url", ScalarType::url(2801)),
        ])
        .unwrap();
    let hosts = schema
        .relationship("hosts", [
            Property::new("since", ScalarType::DateTime).nullable(false),
            Property::new("accessible", ScalarType::Boolean),
        ])
        .unwrap();
    let adj = schema.adjacency(Adjacency::new(website, hosts, page).unique(false).nullable(true));

    schema.map(hosts_class(), hosts, []).unwrap();
    schema.map(page_class(), page, [("isHostedBy", adj)]).unwrap();
    schema.map(website_class(), website, [("hosts", adj)]).unwrap();
    Arc::new(schema.build())
}

pub fn website(name: &str) -> Entity {
    let site = website_class().instantiate();
    site.set("name", name);
    site.set("domain", format!("http://{name}.com"));
    site
}

pub fn page(title: &str) -> Entity {
    let page = page_class().instantiate();
    page.set("title", title);
    page
}

pub fn session() -> (Session<RecordingStore>, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::default());
    (Session::new(Arc::clone(&store), metadata()), store)
}

// ============================================================================
// RecordingStore
// ============================================================================

/// One store call, with what the test needs to check ordering and payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateVertex(String),
    CreateEdge(String),
    UpdateVertex(ElementId, Vec<String>),
    UpdateEdge(ElementId, Vec<String>),
    DeleteVertex(ElementId),
    DeleteEdge(ElementId),
    Query(Query),
}

/// `MemoryStore` that logs every write and can be told to fail edge
/// creation.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
    fail_edges: AtomicBool,
}

impl RecordingStore {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    pub fn fail_edges(&self, fail: bool) {
        self.fail_edges.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Index of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.lock().iter().position(pred)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

fn sorted_keys(fields: &PropertyMap) -> Vec<String> {
    let mut keys: Vec<String> = fields.keys().cloned().collect();
    keys.sort();
    keys
}

impl GraphStore for RecordingStore {
    fn get_vertex(&self, id: ElementId) -> Result<Option<Record>> {
        self.inner.get_vertex(id)
    }

    fn create_vertex(&self, fields: PropertyMap) -> Result<Record> {
        let model = fields.get("element_type").and_then(|v| v.as_str()).unwrap_or("?").to_string();
        self.record(Call::CreateVertex(model));
        self.inner.create_vertex(fields)
    }

    fn update_vertex(&self, id: ElementId, fields: PropertyMap) -> Result<()> {
        self.record(Call::UpdateVertex(id, sorted_keys(&fields)));
        self.inner.update_vertex(id, fields)
    }

    fn delete_vertex(&self, id: ElementId) -> Result<()> {
        self.record(Call::DeleteVertex(id));
        self.inner.delete_vertex(id)
    }

    fn get_edge(&self, id: ElementId) -> Result<Option<Record>> {
        self.inner.get_edge(id)
    }

    fn create_edge(&self, out_id: ElementId, label: &str, in_id: ElementId, fields: PropertyMap) -> Result<Record> {
        if self.fail_edges.load(Ordering::SeqCst) {
            return Err(Error::Store("edge creation disabled".into()));
        }
        self.record(Call::CreateEdge(label.to_string()));
        self.inner.create_edge(out_id, label, in_id, fields)
    }

    fn update_edge(&self, id: ElementId, fields: PropertyMap) -> Result<()> {
        self.record(Call::UpdateEdge(id, sorted_keys(&fields)));
        self.inner.update_edge(id, fields)
    }

    fn delete_edge(&self, id: ElementId) -> Result<()> {
        self.record(Call::DeleteEdge(id));
        self.inner.delete_edge(id)
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        self.record(Call::Query(query.clone()));
        self.inner.query(query)
    }
}
