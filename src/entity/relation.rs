//! Relation accessors: lazy, bidirectional relationship collections.
//!
//! Every node class that sits on an adjacency gets one accessor per side it
//! owns. Inserting `(relationship, endpoint)` on one side inserts
//! `(relationship, owner)` on the endpoint's reverse accessor, so both
//! collections always agree on the relationship key.
//!
//! ## Ownership
//!
//! A collection holds its relationship keys strongly and its endpoints
//! weakly; a relationship holds its out/in vertices weakly. Two mirrored
//! collections therefore never keep each other alive.

use smallvec::SmallVec;
use tracing::trace;

use crate::element::Direction;
use crate::schema::{AccessorBinding, Adjacency, MetaData, ModelId};
use crate::{Error, Result};
use super::{Entity, WeakEntity};

// ============================================================================
// RelationSet
// ============================================================================

#[derive(Debug, Clone)]
struct RelationEntry {
    relationship: Entity,
    endpoint: WeakEntity,
}

/// Insertion-ordered {relationship → endpoint} map stored in the owner's
/// envelope.
#[derive(Debug, Clone, Default)]
pub struct RelationSet {
    entries: SmallVec<[RelationEntry; 4]>,
}

impl RelationSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, relationship: &Entity) -> bool {
        self.position(relationship).is_some()
    }

    pub fn get(&self, relationship: &Entity) -> Option<Entity> {
        self.position(relationship)
            .and_then(|i| self.entries[i].endpoint.upgrade())
    }

    /// Replaces the endpoint when the key is already present.
    pub(crate) fn insert(&mut self, relationship: Entity, endpoint: WeakEntity) {
        match self.position(&relationship) {
            Some(i) => self.entries[i].endpoint = endpoint,
            None => self.entries.push(RelationEntry { relationship, endpoint }),
        }
    }

    /// `(relationship, endpoint)` pairs whose endpoint is still alive.
    pub fn entries(&self) -> Vec<(Entity, Entity)> {
        self.entries
            .iter()
            .filter_map(|e| e.endpoint.upgrade().map(|end| (e.relationship.clone(), end)))
            .collect()
    }

    fn position(&self, relationship: &Entity) -> Option<usize> {
        self.entries.iter().position(|e| e.relationship == *relationship)
    }
}

// ============================================================================
// Relation
// ============================================================================

/// View over one side of one adjacency on one instance.
///
/// Obtained from [`Entity::relation`]. The view holds no lock; every call
/// reads or writes the collection cached in the owner's envelope.
#[derive(Debug, Clone)]
pub struct Relation<'m> {
    owner: Entity,
    name: String,
    metadata: &'m MetaData,
    binding: AccessorBinding,
}

impl<'m> Relation<'m> {
    pub(crate) fn new(owner: Entity, name: &str, metadata: &'m MetaData, binding: AccessorBinding) -> Self {
        Self { owner, name: name.to_string(), metadata, binding }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &Entity {
        &self.owner
    }

    pub fn direction(&self) -> Direction {
        self.binding.direction
    }

    pub fn adjacency(&self) -> &'m Adjacency {
        self.metadata.adjacency(self.binding.adjacency)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Links `endpoint` through a freshly constructed relationship and
    /// returns that relationship.
    pub fn append(&self, endpoint: &Entity) -> Result<Entity> {
        let relationship = self.metadata.for_model(self.adjacency().relationship())?.instantiate();
        self.insert(&relationship, endpoint)?;
        Ok(relationship)
    }

    /// Links `endpoint` through `relationship` on this side and mirrors the
    /// pair onto the endpoint's reverse accessor.
    pub fn insert(&self, relationship: &Entity, endpoint: &Entity) -> Result<()> {
        let adjacency = self.adjacency();
        let direction = self.direction();
        self.check_class(relationship, adjacency.relationship())?;
        self.check_class(endpoint, adjacency.endpoint_model(direction))?;

        match direction {
            Direction::Outgoing => relationship.set_endpoints(&self.owner, endpoint),
            Direction::Incoming => relationship.set_endpoints(endpoint, &self.owner),
        }
        self.owner.with_relation(&self.name, |set| {
            set.insert(relationship.clone(), endpoint.downgrade());
        });

        let Some(backref) = adjacency.reverse_accessor(direction) else {
            trace!(accessor = %self.name, "relation.mirror.no_backref");
            return Ok(());
        };
        // Stops the two sides from mirroring each other forever.
        if endpoint.read_relation(backref, |set| set.is_some_and(|s| s.contains(relationship))) {
            return Ok(());
        }
        let binding = self.metadata.accessor(endpoint.class(), backref)?;
        trace!(accessor = %self.name, backref, "relation.mirror");
        Relation::new(endpoint.clone(), backref, self.metadata, binding).insert(relationship, &self.owner)
    }

    fn check_class(&self, entity: &Entity, model: ModelId) -> Result<()> {
        let expected = self.metadata.for_model(model)?;
        if entity.class() != expected {
            return Err(Error::Constraint {
                expected: expected.name().to_string(),
                got: entity.class().name().to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn get(&self, relationship: &Entity) -> Option<Entity> {
        self.owner.read_relation(&self.name, |set| set.and_then(|s| s.get(relationship)))
    }

    pub fn contains(&self, relationship: &Entity) -> bool {
        self.owner.read_relation(&self.name, |set| set.is_some_and(|s| s.contains(relationship)))
    }

    pub fn len(&self) -> usize {
        self.owner.read_relation(&self.name, |set| set.map_or(0, RelationSet::len))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<(Entity, Entity)> {
        self.owner.read_relation(&self.name, |set| set.map(RelationSet::entries).unwrap_or_default())
    }

    /// Relationship instances, in insertion order.
    pub fn keys(&self) -> Vec<Entity> {
        self.entries().into_iter().map(|(rel, _)| rel).collect()
    }

    /// Endpoint instances, in insertion order.
    pub fn values(&self) -> Vec<Entity> {
        self.entries().into_iter().map(|(_, end)| end).collect()
    }
}
