//! UnitOfWork: dispatches one commit's worth of objects to the store.
//!
//! The unit of work applies each object as it is handed over. It does not
//! reorder anything: the session feeds it nodes before relationships on the
//! way in and relationships before nodes on the way out.

use tracing::{debug, trace};

use crate::element::{ElementId, PropertyMap, Value};
use crate::entity::Entity;
use crate::schema::{MetaData, Model, ModelKind};
use crate::storage::GraphStore;
use crate::{Error, Result};
use super::IdentityMap;

/// Store calls issued by one unit of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub vertices_created: usize,
    pub edges_created: usize,
    pub vertices_updated: usize,
    pub edges_updated: usize,
    pub vertices_deleted: usize,
    pub edges_deleted: usize,
    /// Updates dropped because nothing changed.
    pub updates_skipped: usize,
}

impl FlushStats {
    pub fn total(&self) -> usize {
        self.vertices_created
            + self.edges_created
            + self.vertices_updated
            + self.edges_updated
            + self.vertices_deleted
            + self.edges_deleted
    }
}

/// Single-use orchestrator bound to one store, one identity map and one
/// schema.
pub struct UnitOfWork<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    identity_map: &'a mut IdentityMap,
    metadata: &'a MetaData,
    stats: FlushStats,
}

impl<'a, S: GraphStore + ?Sized> UnitOfWork<'a, S> {
    pub fn new(store: &'a S, identity_map: &'a mut IdentityMap, metadata: &'a MetaData) -> Self {
        Self { store, identity_map, metadata, stats: FlushStats::default() }
    }

    /// Inserts `obj`, or updates it when it already has a store id.
    ///
    /// An object persisted outside this identity map (another session, or
    /// before a `clear()`) is tracked under its id with an empty snapshot,
    /// so every present attribute is written back.
    pub fn register_new(&mut self, obj: &Entity) -> Result<()> {
        let tracked = self.identity_map.state(obj).and_then(|state| state.id());
        match tracked.or_else(|| obj.id()) {
            Some(id) => {
                if tracked.is_none() {
                    trace!(key = %obj.key(), %id, "uow.register.adopt");
                    self.identity_map.add_persisted(obj, id, PropertyMap::new())?;
                }
                self.update(obj)
            }
            None => self.insert(obj),
        }
    }

    // ========================================================================
    // Insert
    // ========================================================================

    pub fn insert(&mut self, obj: &Entity) -> Result<()> {
        let model = self.metadata.for_object(obj)?;
        if let Some(id) = obj.id() {
            return Err(Error::Identity(format!(
                "{} instance {} is already stored as {id}.",
                obj.class().name(),
                obj.key(),
            )));
        }
        let (mut fields, snapshot) = Self::changes(obj, model, |_, _| true)?;
        let record = match model.kind() {
            ModelKind::Node => {
                fields.insert(model.storage_key().to_string(), Value::from(model.name()));
                let record = self.store.create_vertex(fields)?;
                self.stats.vertices_created += 1;
                debug!(model = model.name(), id = %record.id, "uow.insert.vertex");
                record
            }
            ModelKind::Relationship => {
                let out_id = endpoint_id(obj.out_v(), "out", model)?;
                let in_id = endpoint_id(obj.in_v(), "in", model)?;
                let record = self.store.create_edge(out_id, model.name(), in_id, fields)?;
                self.stats.edges_created += 1;
                debug!(model = model.name(), id = %record.id, %out_id, %in_id, "uow.insert.edge");
                record
            }
        };
        obj.set_id(record.id)?;
        self.identity_map.add_persisted(obj, record.id, snapshot)
    }

    // ========================================================================
    // Update
    // ========================================================================

    pub fn update(&mut self, obj: &Entity) -> Result<()> {
        let model = self.metadata.for_object(obj)?;
        let id = self.tracked_id(obj)?;
        let (fields, changed) = {
            let state = self.identity_map.add(obj);
            Self::changes(obj, model, |name, value| state.attribute_has_changed(name, value))?
        };
        if fields.is_empty() {
            self.stats.updates_skipped += 1;
            debug!(model = model.name(), %id, "uow.update.skip");
            return Ok(());
        }
        match model.kind() {
            ModelKind::Node => {
                self.store.update_vertex(id, fields)?;
                self.stats.vertices_updated += 1;
            }
            ModelKind::Relationship => {
                self.store.update_edge(id, fields)?;
                self.stats.edges_updated += 1;
            }
        }
        debug!(model = model.name(), %id, changed = changed.len(), "uow.update");
        self.identity_map.add(obj).update_attributes(changed);
        Ok(())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    pub fn delete(&mut self, obj: &Entity) -> Result<()> {
        let model = self.metadata.for_object(obj)?;
        let id = self.tracked_id(obj)?;
        match model.kind() {
            ModelKind::Node => {
                self.store.delete_vertex(id)?;
                self.stats.vertices_deleted += 1;
                debug!(model = model.name(), %id, "uow.delete.vertex");
            }
            ModelKind::Relationship => {
                self.store.delete_edge(id)?;
                self.stats.edges_deleted += 1;
                debug!(model = model.name(), %id, "uow.delete.edge");
            }
        }
        if let Some(state) = self.identity_map.state_mut(obj) {
            state.mark_deleted();
        }
        Ok(())
    }

    pub fn stats(&self) -> FlushStats {
        self.stats
    }

    /// Ends the unit of work.
    pub fn finish(self) -> FlushStats {
        self.stats
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn tracked_id(&self, obj: &Entity) -> Result<ElementId> {
        self.identity_map
            .state(obj)
            .and_then(|state| state.id())
            .or_else(|| obj.id())
            .ok_or_else(|| Error::Identity(format!(
                "{} instance {} has no identifier.",
                obj.class().name(),
                obj.key(),
            )))
    }

    /// Validates every property of `model` on `obj` and returns the
    /// included ones twice: store-named and coerced, and as application
    /// values for the snapshot.
    fn changes(
        obj: &Entity,
        model: &Model,
        include: impl Fn(&str, &Value) -> bool,
    ) -> Result<(PropertyMap, PropertyMap)> {
        let mut fields = PropertyMap::new();
        let mut snapshot = PropertyMap::new();
        for property in model.properties() {
            let value = obj.get(property.name_py());
            property.validate(&value).map_err(|errors| property.validation_error(errors))?;
            if !include(property.name_py(), &value) {
                continue;
            }
            trace!(property = %property, "uow.property.write");
            fields.insert(property.store_name().to_string(), property.to_db(&value)?);
            snapshot.insert(property.name_py().to_string(), value);
        }
        Ok((fields, snapshot))
    }
}

fn endpoint_id(endpoint: Option<Entity>, side: &str, model: &Model) -> Result<ElementId> {
    endpoint
        .and_then(|v| v.id())
        .ok_or_else(|| Error::Identity(format!(
            "{model} cannot be created: its {side} vertex is missing or not persisted.",
        )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::props;
    use crate::entity::EntityClass;
    use crate::schema::{Adjacency, Property, ScalarType, SchemaBuilder};
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn metadata() -> MetaData {
        let mut schema = SchemaBuilder::new();
        let website = schema
            .node("Website", [Property::new("name", ScalarType::string(127)).nullable(false)])
            .unwrap();
        let page = schema.node("Page", [Property::new("title", ScalarType::string(127))]).unwrap();
        let hosts = schema
            .relationship("hosts", [Property::new("accessible", ScalarType::Boolean)])
            .unwrap();
        let adj = schema.adjacency(Adjacency::new(website, hosts, page));
        schema.map(EntityClass::new("WebsiteHostsPage"), hosts, []).unwrap();
        schema.map(EntityClass::new("Website"), website, [("hosts", adj)]).unwrap();
        schema.map(EntityClass::new("Page"), page, [("isHostedBy", adj)]).unwrap();
        schema.build()
    }

    #[test]
    fn test_insert_stamps_storage_key() {
        let md = metadata();
        let store = MemoryStore::new();
        let mut map = IdentityMap::new();
        let site = md.for_class_name("Website").unwrap().class().unwrap().instantiate();
        site.set("name", "allrecipes");

        let mut uow = UnitOfWork::new(&store, &mut map, &md);
        uow.insert(&site).unwrap();
        assert_eq!(uow.finish().vertices_created, 1);

        let id = site.id().unwrap();
        let record = store.get_vertex(id).unwrap().unwrap();
        assert_eq!(record.fields, props([("element_type", "Website"), ("name", "allrecipes")]));
        assert_eq!(map.get_by_id(id), Some(site));
    }

    #[test]
    fn test_insert_validates() {
        let md = metadata();
        let store = MemoryStore::new();
        let mut map = IdentityMap::new();
        let site = EntityClass::new("Website").instantiate();

        let err = UnitOfWork::new(&store, &mut map, &md).insert(&site).unwrap_err();
        assert!(matches!(err, Error::Validation { ref property, .. } if property == "name"));
        assert_eq!(store.vertex_count(), 0);
        assert!(map.is_empty());
    }

    #[test]
    fn test_edge_needs_persisted_endpoints() {
        let md = metadata();
        let store = MemoryStore::new();
        let mut map = IdentityMap::new();
        let site = EntityClass::new("Website").instantiate();
        site.set("name", "x");
        let page = EntityClass::new("Page").instantiate();
        let edge = site.relation(&md, "hosts").unwrap().append(&page).unwrap();

        let mut uow = UnitOfWork::new(&store, &mut map, &md);
        assert!(matches!(uow.insert(&edge), Err(Error::Identity(_))));
        uow.insert(&site).unwrap();
        uow.insert(&page).unwrap();
        uow.insert(&edge).unwrap();

        let record = store.get_edge(edge.id().unwrap()).unwrap().unwrap();
        assert_eq!(record.endpoints, Some((site.id().unwrap(), page.id().unwrap())));
        assert_eq!(record.get("label"), Some(&Value::from("hosts")));
    }

    #[test]
    fn test_update_sends_only_changes() {
        let md = metadata();
        let store = MemoryStore::new();
        let mut map = IdentityMap::new();
        let page = EntityClass::new("Page").instantiate();
        page.set("title", "Home");

        let mut uow = UnitOfWork::new(&store, &mut map, &md);
        uow.insert(&page).unwrap();
        uow.register_new(&page).unwrap();
        assert_eq!(uow.stats().updates_skipped, 1);

        page.set("title", "About");
        uow.register_new(&page).unwrap();
        let stats = uow.finish();
        assert_eq!((stats.vertices_created, stats.vertices_updated), (1, 1));
        assert_eq!(
            map.state(&page).unwrap().snapshot().get("title"),
            Some(&Value::from("About")),
        );
    }

    #[test]
    fn test_register_new_adopts_foreign_id() {
        let md = metadata();
        let store = MemoryStore::new();
        let page = EntityClass::new("Page").instantiate();
        page.set("title", "Home");
        let mut first = IdentityMap::new();
        UnitOfWork::new(&store, &mut first, &md).insert(&page).unwrap();
        let id = page.id().unwrap();

        let mut map = IdentityMap::new();
        let mut uow = UnitOfWork::new(&store, &mut map, &md);
        assert!(matches!(uow.insert(&page), Err(Error::Identity(_))));
        uow.register_new(&page).unwrap();
        let stats = uow.finish();
        assert_eq!((stats.vertices_created, stats.vertices_updated), (0, 1));
        assert_eq!(page.id(), Some(id));
        assert_eq!(map.get_by_id(id), Some(page.clone()));
        assert_eq!(store.vertex_count(), 1);
    }

    #[test]
    fn test_delete_requires_id() {
        let md = metadata();
        let store = MemoryStore::new();
        let mut map = IdentityMap::new();
        let page = EntityClass::new("Page").instantiate();

        let mut uow = UnitOfWork::new(&store, &mut map, &md);
        assert!(matches!(uow.delete(&page), Err(Error::Identity(_))));
        uow.insert(&page).unwrap();
        uow.delete(&page).unwrap();
        assert_eq!(uow.finish().vertices_deleted, 1);
        assert!(map.state(&page).unwrap().is_deleted());
        assert_eq!(store.vertex_count(), 0);
    }
}
