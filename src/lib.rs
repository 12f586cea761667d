//! # graph-ogm: Object-Graph Mapper
//!
//! Binds application objects to the vertices and edges of a property graph,
//! enforces a declarative schema, and persists pending changes in the order
//! graph referential structure demands.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore` is the contract between the mapper and storage
//! 2. **Clean DTOs**: `Value`, `PropertyMap`, `Record` cross all boundaries
//! 3. **Immutable schema**: `SchemaBuilder` produces a `MetaData` shared by every session
//! 4. **Two-sided relations**: inserting on one side of an adjacency is visible on the other
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use graph_ogm::{Adjacency, EntityClass, MemoryStore, Property, ScalarType, SchemaBuilder, Session};
//!
//! # fn main() -> graph_ogm::Result<()> {
//! let mut schema = SchemaBuilder::new();
//! let website = schema.node("Website", [Property::new("name", ScalarType::string(127))])?;
//! let page = schema.node("Page", [Property::new("title", ScalarType::string(127))])?;
//! let hosts = schema.relationship("hosts", [])?;
//! let adj = schema.adjacency(Adjacency::new(website, hosts, page).unique(false));
//! schema.map(EntityClass::new("WebsiteHostsPage"), hosts, [])?;
//! schema.map(EntityClass::new("Website"), website, [("hosts", adj)])?;
//! schema.map(EntityClass::new("Page"), page, [("isHostedBy", adj)])?;
//! let metadata = Arc::new(schema.build());
//!
//! let site = EntityClass::new("Website").instantiate();
//! let home = EntityClass::new("Page").instantiate();
//! let edge = site.relation(&metadata, "hosts")?.append(&home)?;
//! assert_eq!(home.relation(&metadata, "isHostedBy")?.get(&edge), Some(site.clone()));
//!
//! let mut session = Session::new(Arc::new(MemoryStore::new()), metadata.clone());
//! session.add(&edge)?.add(&home)?.add(&site)?;
//! let stats = session.commit()?;
//! assert_eq!((stats.vertices_created, stats.edges_created), (2, 1));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod element;
pub mod schema;
pub mod entity;
pub mod ogm;
pub mod storage;

// ============================================================================
// Re-exports: Elements (the DTOs)
// ============================================================================

pub use element::{Direction, ElementId, ElementKind, PropertyMap, Record, Value};

// ============================================================================
// Re-exports: Schema / Entities
// ============================================================================

pub use schema::{Adjacency, MetaData, Model, ModelKind, Property, ScalarType, SchemaBuilder};
pub use entity::{Entity, EntityClass, Relation};

// ============================================================================
// Re-exports: Persistence
// ============================================================================

pub use ogm::{FlushStats, IdentityMap, Ogm, OgmConfig, Repository, Selection, Session};
pub use storage::{GraphStore, MemoryStore, Query, StoreConfig};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown field '{field}' for model {model}")]
    UnknownField { model: String, field: String },

    #[error("Unmapped: {0}")]
    Unmapped(String),

    #[error("Validation error on {model}.{property}: {}", errors.join(" "))]
    Validation { model: String, property: String, errors: Vec<String> },

    #[error("Constraint error: expected {expected}, got {got}")]
    Constraint { expected: String, got: String },

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No result found for {0}")]
    NoResultFound(String),

    #[error("Multiple results found for {model} ({count} or more)")]
    MultipleResultsFound { model: String, count: usize },

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
