//! Session: pending changes and the commit that flushes them.

use std::sync::Arc;

use hashbrown::HashSet;
use tracing::{debug, info, trace, warn};

use crate::element::{ElementId, Record};
use crate::entity::{Entity, InstanceKey};
use crate::schema::MetaData;
use crate::storage::GraphStore;
use crate::{Error, Result};
use super::{FlushStats, IdentityMap, UnitOfWork};

/// Outcome of an identity-map-first lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The session already tracks an instance with that id.
    Tracked(Entity),
    /// Not tracked: the raw store answer, to be hydrated by the caller.
    Fetched(Option<Record>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Insert,
    Update,
    Delete,
}

/// A set of modifications to synchronize with the store.
///
/// Instances are scheduled with [`add`](Session::add) and
/// [`delete`](Session::delete) and written by [`commit`](Session::commit).
/// The three pending sets are mutually exclusive and keep insertion order.
pub struct Session<S: GraphStore> {
    store: Arc<S>,
    metadata: Arc<MetaData>,
    identity_map: IdentityMap,
    pending_new: Vec<Entity>,
    pending_update: Vec<Entity>,
    pending_delete: Vec<Entity>,
}

impl<S: GraphStore> Session<S> {
    pub fn new(store: Arc<S>, metadata: Arc<MetaData>) -> Self {
        Self {
            store,
            metadata,
            identity_map: IdentityMap::new(),
            pending_new: Vec::new(),
            pending_update: Vec::new(),
            pending_delete: Vec::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> { &self.store }
    pub fn metadata(&self) -> &Arc<MetaData> { &self.metadata }
    pub fn identity_map(&self) -> &IdentityMap { &self.identity_map }
    pub fn pending_new(&self) -> &[Entity] { &self.pending_new }
    pub fn pending_update(&self) -> &[Entity] { &self.pending_update }
    pub fn pending_delete(&self) -> &[Entity] { &self.pending_delete }

    pub(crate) fn identity_map_mut(&mut self) -> &mut IdentityMap {
        &mut self.identity_map
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Schedules `obj` for insertion, or for update when the session
    /// already tracks it. Cancels a pending delete.
    pub fn add(&mut self, obj: &Entity) -> Result<&mut Self> {
        if !self.metadata.is_bind(obj) {
            return Err(Error::Unmapped(format!("Unmapped class '{}'.", obj.class().name())));
        }
        if self.identity_map.state(obj).is_some_and(|state| state.is_deleted()) {
            return Err(Error::Identity(format!(
                "{} instance {} was deleted from the store.",
                obj.class().name(),
                obj.key(),
            )));
        }
        self.pending_delete.retain(|pending| pending != obj);
        if self.pending_new.contains(obj) || self.pending_update.contains(obj) {
            trace!(key = %obj.key(), "session.add.already_pending");
            return Ok(self);
        }
        if self.identity_map.contains(obj) {
            self.pending_update.push(obj.clone());
        } else {
            self.pending_new.push(obj.clone());
        }
        Ok(self)
    }

    /// Schedules a tracked instance for deletion, dropping any pending
    /// insert or update of it.
    pub fn delete(&mut self, obj: &Entity) -> Result<&mut Self> {
        if !self.identity_map.contains(obj) {
            return Err(Error::Identity(format!(
                "{} instance {} is not in the identity map.",
                obj.class().name(),
                obj.key(),
            )));
        }
        self.pending_new.retain(|pending| pending != obj);
        self.pending_update.retain(|pending| pending != obj);
        if self.pending_delete.contains(obj) {
            trace!(key = %obj.key(), "session.delete.already_pending");
            return Ok(self);
        }
        self.pending_delete.push(obj.clone());
        Ok(self)
    }

    /// Forgets every tracked instance and every pending change.
    pub fn clear(&mut self) -> &mut Self {
        self.identity_map.clear();
        self.pending_new.clear();
        self.pending_update.clear();
        self.pending_delete.clear();
        self
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Writes every pending change through one unit of work.
    ///
    /// Order: new nodes, new relationships, updated nodes, updated
    /// relationships, deleted relationships, deleted nodes. Nothing is
    /// rolled back on failure: instances flushed before the failing one
    /// leave the pending sets, the rest stay for the next attempt.
    pub fn commit(&mut self) -> Result<FlushStats> {
        let plan = self.plan();
        let mut flushed = HashSet::with_capacity(plan.len());
        let mut failure = None;

        let mut uow = UnitOfWork::new(&*self.store, &mut self.identity_map, &self.metadata);
        for (obj, op) in &plan {
            debug!(key = %obj.key(), class = obj.class().name(), ?op, "session.flush");
            let step = match op {
                Op::Insert => uow.register_new(obj),
                Op::Update => uow.update(obj),
                Op::Delete => uow.delete(obj),
            };
            if let Err(err) = step {
                failure = Some(err);
                break;
            }
            flushed.insert(obj.key());
        }
        let stats = uow.finish();
        self.forget(&flushed);

        match failure {
            Some(err) => {
                warn!(error = %err, flushed = flushed.len(), pending = plan.len() - flushed.len(), "session.commit.error");
                Err(err)
            }
            None => {
                info!(
                    created = stats.vertices_created + stats.edges_created,
                    updated = stats.vertices_updated + stats.edges_updated,
                    deleted = stats.vertices_deleted + stats.edges_deleted,
                    skipped = stats.updates_skipped,
                    "session.commit",
                );
                Ok(stats)
            }
        }
    }

    fn plan(&self) -> Vec<(Entity, Op)> {
        let phases = [
            (&self.pending_new, true, Op::Insert),
            (&self.pending_new, false, Op::Insert),
            (&self.pending_update, true, Op::Update),
            (&self.pending_update, false, Op::Update),
            (&self.pending_delete, false, Op::Delete),
            (&self.pending_delete, true, Op::Delete),
        ];
        let mut plan = Vec::new();
        for (set, nodes, op) in phases {
            plan.extend(
                set.iter()
                    .filter(|obj| self.metadata.is_node(obj) == nodes)
                    .map(|obj| (obj.clone(), op)),
            );
        }
        plan
    }

    fn forget(&mut self, flushed: &HashSet<InstanceKey>) {
        for set in [&mut self.pending_new, &mut self.pending_update, &mut self.pending_delete] {
            set.retain(|obj| !flushed.contains(&obj.key()));
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Identity map first, then the store.
    pub fn get_vertex(&self, id: ElementId) -> Result<Lookup> {
        match self.identity_map.get_by_id(id) {
            Some(obj) => Ok(Lookup::Tracked(obj)),
            None => Ok(Lookup::Fetched(self.store.get_vertex(id)?)),
        }
    }

    /// Identity map first, then the store.
    pub fn get_edge(&self, id: ElementId) -> Result<Lookup> {
        match self.identity_map.get_by_id(id) {
            Some(obj) => Ok(Lookup::Tracked(obj)),
            None => Ok(Lookup::Fetched(self.store.get_edge(id)?)),
        }
    }
}

impl<S: GraphStore> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tracked", &self.identity_map.len())
            .field("pending_new", &self.pending_new.len())
            .field("pending_update", &self.pending_update.len())
            .field("pending_delete", &self.pending_delete.len())
            .finish()
    }
}
