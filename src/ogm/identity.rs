//! IdentityMap: the session's record of every instance it has seen.

use hashbrown::HashMap;

use crate::element::{ElementId, PropertyMap};
use crate::entity::{Entity, InstanceKey};
use crate::Result;
use super::InstanceState;

/// {instance → state}, plus a store-id index.
///
/// Entries are only dropped by `clear()`. Instances themselves are held
/// weakly, so an entry can outlive its object.
#[derive(Debug, Default)]
pub struct IdentityMap {
    states: HashMap<InstanceKey, InstanceState>,
    by_id: HashMap<ElementId, InstanceKey>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `obj`. No-op when already tracked.
    pub fn add(&mut self, obj: &Entity) -> &mut InstanceState {
        let state = self.states.entry(obj.key()).or_insert_with(|| InstanceState::new(obj));
        if let Some(id) = state.id() {
            self.by_id.insert(id, state.key());
        }
        state
    }

    /// Tracks `obj` with the identifier and values it was just persisted
    /// (or fetched) with.
    pub fn add_persisted(&mut self, obj: &Entity, id: ElementId, snapshot: PropertyMap) -> Result<()> {
        let state = self.states.entry(obj.key()).or_insert_with(|| InstanceState::new(obj));
        state.update_id(id)?;
        state.update_attributes(snapshot);
        self.by_id.insert(id, obj.key());
        Ok(())
    }

    pub fn contains(&self, obj: &Entity) -> bool {
        self.states.contains_key(&obj.key())
    }

    pub fn state(&self, obj: &Entity) -> Option<&InstanceState> {
        self.states.get(&obj.key())
    }

    pub fn state_mut(&mut self, obj: &Entity) -> Option<&mut InstanceState> {
        self.states.get_mut(&obj.key())
    }

    /// The live instance tracked under `id`, if any.
    pub fn get_by_id(&self, id: ElementId) -> Option<Entity> {
        self.by_id
            .get(&id)
            .and_then(|key| self.states.get(key))
            .and_then(InstanceState::object)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.by_id.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstanceState> {
        self.states.values()
    }
}
