//! InstanceState: per-object identity and last-persisted snapshot.

use crate::element::{ElementId, PropertyMap, Value};
use crate::entity::{Entity, EntityClass, InstanceKey, WeakEntity};
use crate::{Error, Result};

/// Where a tracked instance stands relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    New,
    /// Removed from the store by a committed delete.
    Deleted,
}

/// What the identity map remembers about one instance.
///
/// The state never keeps its instance alive. The id is write-once; the
/// snapshot holds application values as last written to the store.
#[derive(Debug, Clone)]
pub struct InstanceState {
    obj: WeakEntity,
    class: EntityClass,
    lifecycle: Lifecycle,
    id: Option<ElementId>,
    attributes: PropertyMap,
}

impl InstanceState {
    pub fn new(obj: &Entity) -> Self {
        Self {
            obj: obj.downgrade(),
            class: obj.class().clone(),
            lifecycle: Lifecycle::New,
            id: None,
            attributes: PropertyMap::new(),
        }
    }

    pub fn key(&self) -> InstanceKey { self.obj.key() }
    pub fn class(&self) -> &EntityClass { &self.class }
    pub fn lifecycle(&self) -> Lifecycle { self.lifecycle }
    pub fn is_deleted(&self) -> bool { self.lifecycle == Lifecycle::Deleted }
    pub fn id(&self) -> Option<ElementId> { self.id }
    pub fn snapshot(&self) -> &PropertyMap { &self.attributes }

    /// The tracked instance, if something still holds it.
    pub fn object(&self) -> Option<Entity> {
        self.obj.upgrade()
    }

    pub fn mark_deleted(&mut self) {
        self.lifecycle = Lifecycle::Deleted;
    }

    /// Assigns the store identifier. Reassigning the same id is a no-op;
    /// a different one is rejected.
    pub fn update_id(&mut self, id: ElementId) -> Result<()> {
        match self.id {
            Some(current) if current != id => Err(Error::Identity(format!(
                "Instance {} of '{}' already has id {current}, refusing {id}.",
                self.key(),
                self.class.name(),
            ))),
            _ => {
                self.id = Some(id);
                Ok(())
            }
        }
    }

    /// Merges persisted values into the snapshot.
    pub fn update_attributes(&mut self, attributes: PropertyMap) {
        self.attributes.extend(attributes);
    }

    pub fn attribute_has_changed(&self, name: &str, value: &Value) -> bool {
        match self.attributes.get(name) {
            None => !value.is_null(),
            Some(previous) => previous != value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::props;

    fn state() -> (Entity, InstanceState) {
        let obj = EntityClass::new("Page").instantiate();
        let state = InstanceState::new(&obj);
        (obj, state)
    }

    #[test]
    fn test_id_is_write_once() {
        let (_obj, mut state) = state();
        state.update_id(ElementId(7)).unwrap();
        state.update_id(ElementId(7)).unwrap();
        assert!(matches!(state.update_id(ElementId(8)), Err(Error::Identity(_))));
        assert_eq!(state.id(), Some(ElementId(7)));
    }

    #[test]
    fn test_change_detection() {
        let (_obj, mut state) = state();
        // Never snapshotted: only a present value counts as a change.
        assert!(!state.attribute_has_changed("title", &Value::Null));
        assert!(state.attribute_has_changed("title", &Value::from("Home")));

        state.update_attributes(props([("title", "Home")]));
        assert!(!state.attribute_has_changed("title", &Value::from("Home")));
        assert!(state.attribute_has_changed("title", &Value::from("About")));
        assert!(state.attribute_has_changed("title", &Value::Null));
    }

    #[test]
    fn test_state_does_not_own_instance() {
        let (obj, state) = state();
        assert_eq!(state.object(), Some(obj.clone()));
        assert_eq!(state.key(), obj.key());
        drop(obj);
        assert!(state.object().is_none());
        assert_eq!(state.lifecycle(), Lifecycle::New);
    }
}
