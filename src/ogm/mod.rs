//! # Object-Graph Mapper
//!
//! Persistence engine: identity map, session, unit of work and
//! repositories, plus the [`Ogm`] facade that ties them to one store and
//! one schema.
//!
//! ```rust
//! use std::sync::Arc;
//! use graph_ogm::entity::EntityClass;
//! use graph_ogm::ogm::{Ogm, OgmConfig};
//! use graph_ogm::schema::{Property, ScalarType, SchemaBuilder};
//!
//! # fn main() -> graph_ogm::Result<()> {
//! let mut schema = SchemaBuilder::new();
//! let page = schema.node("Page", [Property::new("title", ScalarType::string(127))])?;
//! schema.map(EntityClass::new("Page"), page, [])?;
//!
//! let config = OgmConfig::from_json_str(r#"{"store": {"kind": "memory"}}"#)?;
//! let mut ogm = Ogm::open(&config, Arc::new(schema.build()));
//! let home = ogm.repository("Page")?.create(Default::default());
//! home.set("title", "Home");
//! ogm.add(&home)?;
//! let stats = ogm.commit()?;
//! assert_eq!(stats.vertices_created, 1);
//! # Ok(())
//! # }
//! ```

pub mod state;
pub mod identity;
pub mod unit_of_work;
pub mod session;
pub mod repository;

pub use state::{InstanceState, Lifecycle};
pub use identity::IdentityMap;
pub use unit_of_work::{FlushStats, UnitOfWork};
pub use session::{Lookup, Session};
pub use repository::{Repository, Selection};

use std::sync::Arc;

use serde::Deserialize;

use crate::entity::Entity;
use crate::schema::MetaData;
use crate::storage::{GraphStore, MemoryStore, StoreConfig};
use crate::Result;

// ============================================================================
// Configuration
// ============================================================================

/// Settings for [`Ogm::open`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OgmConfig {
    #[serde(default)]
    pub store: StoreConfig,
}

impl OgmConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Ogm
// ============================================================================

/// One store, one schema, and the current session (created on first use).
pub struct Ogm<S: GraphStore> {
    store: Arc<S>,
    metadata: Arc<MetaData>,
    session: Option<Session<S>>,
}

impl Ogm<MemoryStore> {
    /// Builds the store named by `config`.
    pub fn open(config: &OgmConfig, metadata: Arc<MetaData>) -> Self {
        match config.store {
            StoreConfig::Memory => Self::new(Arc::new(MemoryStore::new()), metadata),
        }
    }
}

impl<S: GraphStore> Ogm<S> {
    pub fn new(store: Arc<S>, metadata: Arc<MetaData>) -> Self {
        Self { store, metadata, session: None }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn metadata(&self) -> &Arc<MetaData> {
        &self.metadata
    }

    pub fn session(&mut self) -> &mut Session<S> {
        let (store, metadata) = (&self.store, &self.metadata);
        self.session
            .get_or_insert_with(|| Session::new(Arc::clone(store), Arc::clone(metadata)))
    }

    pub fn repository(&mut self, model_name: &str) -> Result<Repository<'_, S>> {
        Repository::new(self.session(), model_name)
    }

    pub fn add(&mut self, obj: &Entity) -> Result<&mut Self> {
        self.session().add(obj)?;
        Ok(self)
    }

    pub fn delete(&mut self, obj: &Entity) -> Result<&mut Self> {
        self.session().delete(obj)?;
        Ok(self)
    }

    pub fn commit(&mut self) -> Result<FlushStats> {
        self.session().commit()
    }

    /// Clears and drops the current session.
    pub fn close(&mut self) -> &mut Self {
        if let Some(mut session) = self.session.take() {
            session.clear();
        }
        self
    }
}
