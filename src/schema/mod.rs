//! # Schema
//!
//! Declarative description of the graph: node and relationship models,
//! their properties, the adjacencies linking them, and the `MetaData`
//! registry that binds models to entity classes.
//!
//! Schema errors are raised eagerly while building; once `build()` returns,
//! `MetaData` is immutable and shared.

pub mod scalar;
pub mod property;
pub mod model;
pub mod adjacency;
pub mod metadata;
pub mod builder;

pub use scalar::ScalarType;
pub use property::Property;
pub use model::{Model, ModelId, ModelKind};
pub use adjacency::{Adjacency, AdjacencyId};
pub use metadata::{AccessorBinding, MetaData};
pub use builder::SchemaBuilder;
