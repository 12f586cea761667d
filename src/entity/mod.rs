//! # Entities
//!
//! The application-object envelope the mapper tracks: a class, a bag of
//! attributes, an optional store id, the two endpoint references a
//! relationship instance carries, and the relation collections
//! materialized on first access.
//!
//! Entities are shared handles. Cloning an [`Entity`] clones the handle,
//! not the object; equality and hashing follow instance identity.

pub mod relation;

pub use relation::{Relation, RelationSet};

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::element::{ElementId, PropertyMap, Value};
use crate::schema::MetaData;
use crate::{Error, Result};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one entity instance.
///
/// Unlike [`ElementId`], the key exists before the entity is persisted and
/// never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey(u64);

impl InstanceKey {
    fn next() -> Self {
        InstanceKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// EntityClass
// ============================================================================

/// An application class: a name plus the attribute defaults every fresh
/// instance starts with.
#[derive(Clone)]
pub struct EntityClass {
    name: Arc<str>,
    defaults: Option<fn() -> PropertyMap>,
}

impl EntityClass {
    pub fn new(name: &str) -> Self {
        Self { name: Arc::from(name), defaults: None }
    }

    /// A class whose constructor seeds attributes from `defaults`.
    pub fn with_defaults(name: &str, defaults: fn() -> PropertyMap) -> Self {
        Self { name: Arc::from(name), defaults: Some(defaults) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Default-constructs an instance.
    pub fn instantiate(&self) -> Entity {
        Entity::new(self)
    }
}

impl PartialEq for EntityClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntityClass {}

impl Hash for EntityClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityClass").field(&self.name).finish()
    }
}

// ============================================================================
// Entity
// ============================================================================

/// Shared handle to one application object.
#[derive(Clone)]
pub struct Entity {
    cell: Arc<EntityCell>,
}

struct EntityCell {
    key: InstanceKey,
    class: EntityClass,
    state: RwLock<EntityData>,
}

#[derive(Default)]
struct EntityData {
    id: Option<ElementId>,
    attributes: PropertyMap,
    /// Endpoints of a relationship instance. Never owning.
    out_v: Option<WeakEntity>,
    in_v: Option<WeakEntity>,
    /// accessor name → collection, created on first access
    relations: HashMap<String, RelationSet>,
}

impl Entity {
    pub fn new(class: &EntityClass) -> Self {
        let attributes = class.defaults.map(|defaults| defaults()).unwrap_or_default();
        Self {
            cell: Arc::new(EntityCell {
                key: InstanceKey::next(),
                class: class.clone(),
                state: RwLock::new(EntityData { attributes, ..Default::default() }),
            }),
        }
    }

    pub fn key(&self) -> InstanceKey {
        self.cell.key
    }

    pub fn class(&self) -> &EntityClass {
        &self.cell.class
    }

    /// Store identifier, once persisted or hydrated.
    pub fn id(&self) -> Option<ElementId> {
        self.cell.state.read().id
    }

    /// Assigns the store id. Once set, only the same id is accepted.
    pub(crate) fn set_id(&self, id: ElementId) -> Result<()> {
        let mut state = self.cell.state.write();
        match state.id {
            Some(current) if current != id => Err(Error::Identity(format!(
                "{} instance {} already has id {current}, refusing {id}.",
                self.cell.class.name(),
                self.cell.key,
            ))),
            _ => {
                state.id = Some(id);
                Ok(())
            }
        }
    }

    /// Attribute value, `Null` when unset.
    pub fn get(&self, name: &str) -> Value {
        self.cell.state.read().attributes.get(name).cloned().unwrap_or_default()
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.cell.state.write().attributes.insert(name.to_string(), value.into());
    }

    /// Snapshot of every attribute.
    pub fn attributes(&self) -> PropertyMap {
        self.cell.state.read().attributes.clone()
    }

    /// Out-vertex of a relationship instance, if set and still alive.
    pub fn out_v(&self) -> Option<Entity> {
        self.cell.state.read().out_v.as_ref().and_then(WeakEntity::upgrade)
    }

    /// In-vertex of a relationship instance, if set and still alive.
    pub fn in_v(&self) -> Option<Entity> {
        self.cell.state.read().in_v.as_ref().and_then(WeakEntity::upgrade)
    }

    pub(crate) fn set_endpoints(&self, out_v: &Entity, in_v: &Entity) {
        let mut state = self.cell.state.write();
        state.out_v = Some(out_v.downgrade());
        state.in_v = Some(in_v.downgrade());
    }

    pub fn downgrade(&self) -> WeakEntity {
        WeakEntity { key: self.key(), cell: Arc::downgrade(&self.cell) }
    }

    // ========================================================================
    // Relations
    // ========================================================================

    /// The relation collection behind accessor `name`, materialized on
    /// first access.
    pub fn relation<'m>(&self, metadata: &'m MetaData, name: &str) -> Result<Relation<'m>> {
        let binding = metadata.accessor(self.class(), name)?;
        self.with_relation(name, |_| ());
        Ok(Relation::new(self.clone(), name, metadata, binding))
    }

    /// Whether accessor `name` has been touched on this instance.
    pub fn has_materialized(&self, name: &str) -> bool {
        self.cell.state.read().relations.contains_key(name)
    }

    pub(crate) fn with_relation<R>(&self, name: &str, f: impl FnOnce(&mut RelationSet) -> R) -> R {
        let mut state = self.cell.state.write();
        f(state.relations.entry(name.to_string()).or_default())
    }

    pub(crate) fn read_relation<R>(&self, name: &str, f: impl FnOnce(Option<&RelationSet>) -> R) -> R {
        f(self.cell.state.read().relations.get(name))
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Entity");
        s.field("class", &self.class().name()).field("key", &self.key());
        // The envelope may be locked by the caller; never block in Debug.
        match self.cell.state.try_read() {
            Some(state) => s.field("id", &state.id).field("attributes", &state.attributes),
            None => s.field("state", &"<locked>"),
        };
        s.finish()
    }
}

/// Non-owning handle to an entity.
#[derive(Clone)]
pub struct WeakEntity {
    key: InstanceKey,
    cell: Weak<EntityCell>,
}

impl WeakEntity {
    pub fn key(&self) -> InstanceKey {
        self.key
    }

    pub fn upgrade(&self) -> Option<Entity> {
        self.cell.upgrade().map(|cell| Entity { cell })
    }
}

impl fmt::Debug for WeakEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakEntity({})", self.key)
    }
}
