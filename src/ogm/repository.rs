//! Repository: the collection of every instance of one model.

use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::element::{ElementId, PropertyMap, Record, Value};
use crate::entity::{Entity, EntityClass};
use crate::schema::{MetaData, Model, ModelId, ModelKind};
use crate::storage::{GraphStore, Query};
use crate::{Error, Result};
use super::{Lookup, Session};

/// Per-model facade over a session: construct, fetch by id, select.
///
/// Everything a repository loads goes through the session's identity map,
/// so one store element is never hydrated into two live instances.
pub struct Repository<'s, S: GraphStore> {
    session: &'s mut Session<S>,
    model: ModelId,
    class: EntityClass,
}

impl<'s, S: GraphStore> Repository<'s, S> {
    pub fn new(session: &'s mut Session<S>, model_name: &str) -> Result<Self> {
        let metadata = session.metadata();
        let model = metadata.for_model_name(model_name)?.id();
        let class = metadata.for_model(model)?.clone();
        Ok(Self { session, model, class })
    }

    pub fn model(&self) -> &Model {
        self.session.metadata().model(self.model)
    }

    pub fn class(&self) -> &EntityClass {
        &self.class
    }

    /// A fresh, untracked instance of the mapped class.
    pub fn create(&self, attributes: PropertyMap) -> Entity {
        let obj = self.class.instantiate();
        for (name, value) in attributes {
            obj.set(&name, value);
        }
        obj
    }

    /// The instance stored under `id`, from the identity map when possible.
    pub fn get(&mut self, id: ElementId) -> Result<Option<Entity>> {
        let lookup = match self.model().kind() {
            ModelKind::Node => self.session.get_vertex(id)?,
            ModelKind::Relationship => self.session.get_edge(id)?,
        };
        match lookup {
            Lookup::Tracked(obj) => {
                debug!(model = self.model().name(), %id, "repository.get.tracked");
                self.check_class(&obj)?;
                Ok(Some(obj))
            }
            Lookup::Fetched(None) => Ok(None),
            Lookup::Fetched(Some(record)) => {
                debug!(model = self.model().name(), %id, "repository.get.fetched");
                if record.id != id {
                    return Err(Error::Identity(format!("Expected element {id}, got {}.", record.id)));
                }
                self.hydrate(record).map(Some)
            }
        }
    }

    /// Instances whose attributes equal every criterion.
    pub fn filter<'c>(&mut self, criteria: impl IntoIterator<Item = (&'c str, Value)>) -> Result<Vec<Entity>> {
        self.select(criteria)?.all()
    }

    /// A lazy selection over instances matching every criterion.
    ///
    /// The first indexed criterion drives the store lookup; without one the
    /// lookup goes through the model-name index.
    pub fn select<'c>(
        &mut self,
        criteria: impl IntoIterator<Item = (&'c str, Value)>,
    ) -> Result<Selection<'_, 's, S>> {
        let metadata = Arc::clone(self.session.metadata());
        let model = metadata.model(self.model);
        let mut criteria: Vec<(&str, Value)> = criteria.into_iter().collect();

        let query = match model.kind() {
            ModelKind::Node => Query::vertices(),
            ModelKind::Relationship => Query::edges(),
        };
        let mut query = match criteria.iter().position(|(name, _)| model.is_indexed(name)) {
            Some(pos) => {
                let (name, value) = criteria.remove(pos);
                let (key, value) = store_criterion(model, name, &value)?;
                query.on_index(key, value).filter(model.storage_key(), model.name())
            }
            None => query.on_index(model.storage_key(), model.name()),
        };
        for (name, value) in &criteria {
            let (key, value) = store_criterion(model, name, value)?;
            query = query.filter(key, value);
        }
        Ok(Selection { repository: self, query })
    }

    /// Schedules every instance of the model for deletion.
    ///
    /// Returns how many were scheduled; the store is touched on commit.
    pub fn truncate(&mut self) -> Result<usize> {
        self.select([])?.delete()
    }

    fn fetch(&mut self, query: &Query) -> Result<Vec<Record>> {
        let records = self.session.store().query(query)?;
        debug!(model = self.model().name(), found = records.len(), "repository.fetch");
        Ok(records)
    }

    /// Turns a record into the tracked instance for its id.
    fn hydrate(&mut self, record: Record) -> Result<Entity> {
        if let Some(obj) = self.session.identity_map().get_by_id(record.id) {
            self.check_class(&obj)?;
            return Ok(obj);
        }
        let metadata: Arc<MetaData> = Arc::clone(self.session.metadata());
        let raw = record.to_dict()?;
        let model = metadata
            .for_dict(&raw)
            .filter(|model| model.id() == self.model)
            .ok_or_else(|| Error::Constraint {
                expected: self.model().name().to_string(),
                got: raw
                    .get(self.model().storage_key())
                    .map_or_else(|| "unmapped record".to_string(), Value::to_string),
            })?;

        let obj = self.class.instantiate();
        metadata.update_object(&obj, &raw, model)?;
        if let Some((out_id, in_id)) = record.endpoints {
            let identity_map = self.session.identity_map();
            if let (Some(out_v), Some(in_v)) = (identity_map.get_by_id(out_id), identity_map.get_by_id(in_id)) {
                link(&metadata, model, &obj, &out_v, &in_v)?;
            }
        }
        let snapshot = model
            .properties()
            .iter()
            .map(|p| (p.name_py().to_string(), obj.get(p.name_py())))
            .collect();
        self.session.identity_map_mut().add_persisted(&obj, record.id, snapshot)?;
        Ok(obj)
    }

    fn check_class(&self, obj: &Entity) -> Result<()> {
        if *obj.class() != self.class {
            return Err(Error::Constraint {
                expected: self.class.name().to_string(),
                got: obj.class().name().to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Store query bound to a repository; nothing runs until a terminal call
/// (`all`, `first`, `one`, `delete`).
pub struct Selection<'r, 's, S: GraphStore> {
    repository: &'r mut Repository<'s, S>,
    query: Query,
}

impl<S: GraphStore> Selection<'_, '_, S> {
    /// The store query as built so far.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    /// Narrows the window to `range`, relative to the current offset.
    pub fn slice(mut self, range: Range<usize>) -> Self {
        let offset = self.query.offset.unwrap_or(0) + range.start;
        self.query = self.query.offset(offset).limit(range.len());
        self
    }

    pub fn all(self) -> Result<Vec<Entity>> {
        let records = self.repository.fetch(&self.query)?;
        records.into_iter().map(|record| self.repository.hydrate(record)).collect()
    }

    pub fn first(mut self) -> Result<Option<Entity>> {
        self.query.limit = Some(self.query.limit.map_or(1, |limit| limit.min(1)));
        Ok(self.all()?.into_iter().next())
    }

    /// Exactly one match, or `NoResultFound` / `MultipleResultsFound`.
    pub fn one(mut self) -> Result<Entity> {
        self.query.limit = Some(self.query.limit.map_or(2, |limit| limit.min(2)));
        let mut records = self.repository.fetch(&self.query)?;
        let model = self.repository.model().name().to_string();
        match records.len() {
            0 => Err(Error::NoResultFound(model)),
            1 => self.repository.hydrate(records.remove(0)),
            count => Err(Error::MultipleResultsFound { model, count }),
        }
    }

    /// Schedules every match for deletion and returns how many there were.
    pub fn delete(self) -> Result<usize> {
        let Selection { repository, query } = self;
        let records = repository.fetch(&query)?;
        let count = records.len();
        for record in records {
            let obj = repository.hydrate(record)?;
            trace!(key = %obj.key(), "repository.delete");
            repository.session.delete(&obj)?;
        }
        Ok(count)
    }
}

/// Store name and store value for an application-level criterion.
fn store_criterion(model: &Model, name: &str, value: &Value) -> Result<(String, Value)> {
    let property = model.property(name).ok_or_else(|| Error::Unmapped(format!(
        "Property '{name}' not found in model {model}.",
    )))?;
    Ok((property.store_name().to_string(), property.to_db(value)?))
}

/// Attaches a hydrated relationship to its tracked endpoints.
///
/// Goes through the relation accessor when one exists, so both endpoint
/// collections see the relationship.
fn link(metadata: &MetaData, model: &Model, rel: &Entity, out_v: &Entity, in_v: &Entity) -> Result<()> {
    let out_model = metadata.for_object(out_v)?.id();
    let in_model = metadata.for_object(in_v)?.id();
    let adjacency = model
        .adjacencies()
        .map(|(_, id)| metadata.adjacency(id))
        .find(|adj| adj.out_node() == out_model && adj.in_node() == in_model);
    match adjacency.map(|adj| (adj.out_accessor(), adj.in_accessor())) {
        Some((Some(name), _)) => out_v.relation(metadata, name)?.insert(rel, in_v),
        Some((None, Some(name))) => in_v.relation(metadata, name)?.insert(rel, out_v),
        _ => {
            rel.set_endpoints(out_v, in_v);
            Ok(())
        }
    }
}
