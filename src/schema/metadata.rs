//! MetaData: the {class ↔ model} registry consulted by the whole mapper.

use std::collections::HashMap;
use std::sync::Arc;

use crate::element::{Direction, ElementId, PropertyMap, Value, ID_FIELD};
use crate::entity::{Entity, EntityClass};
use crate::{Error, Result};
use super::{Adjacency, AdjacencyId, Model, ModelId, ModelKind};

/// Where an accessor name on a class leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorBinding {
    pub adjacency: AdjacencyId,
    pub direction: Direction,
}

/// Registry of every mapped model.
///
/// Built once through [`SchemaBuilder`](super::SchemaBuilder) and then shared
/// read-only (usually as `Arc<MetaData>`) by sessions, units of work and
/// repositories. Node and relationship classes live in two disjoint
/// registries.
#[derive(Debug, Default)]
pub struct MetaData {
    models: Vec<Model>,
    adjacencies: Vec<Adjacency>,
    nodes: HashMap<Arc<str>, ModelId>,
    relationships: HashMap<Arc<str>, ModelId>,
    /// class → accessor name → adjacency side
    accessors: HashMap<Arc<str>, HashMap<String, AccessorBinding>>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Tables
    // ========================================================================

    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id.0]
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    pub fn adjacency(&self, id: AdjacencyId) -> &Adjacency {
        &self.adjacencies[id.0]
    }

    pub(crate) fn next_model_id(&self) -> ModelId {
        ModelId(self.models.len())
    }

    /// Appends a model built against `next_model_id()`.
    pub(crate) fn push_model(&mut self, model: Model) -> ModelId {
        let id = model.id();
        debug_assert_eq!(id, self.next_model_id());
        self.models.push(model);
        id
    }

    pub(crate) fn push_adjacency(&mut self, adjacency: Adjacency) -> AdjacencyId {
        let id = AdjacencyId(self.adjacencies.len());
        self.adjacencies.push(adjacency);
        id
    }

    /// Split borrow used while binding an adjacency to a model.
    pub(crate) fn model_and_adjacency_mut(
        &mut self,
        model: ModelId,
        adjacency: AdjacencyId,
    ) -> (&mut Model, &mut Adjacency) {
        (&mut self.models[model.0], &mut self.adjacencies[adjacency.0])
    }

    pub(crate) fn model_mut(&mut self, id: ModelId) -> &mut Model {
        &mut self.models[id.0]
    }

    pub(crate) fn install_accessor(&mut self, class: &EntityClass, name: &str, binding: AccessorBinding) {
        self.accessors
            .entry(class.shared_name())
            .or_default()
            .insert(name.to_string(), binding);
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Binds `class` to a node model.
    pub fn bind_node(&mut self, class: &EntityClass, model: ModelId) -> Result<&mut Self> {
        if !self.model(model).is_node() {
            return Err(Error::Schema(format!("Bound model {} is not a node.", self.model(model))));
        }
        if self.relationships.contains_key(class.name()) {
            return Err(Error::Schema(format!(
                "Class '{}' is already bound to a relationship.",
                class.name(),
            )));
        }
        self.nodes.insert(class.shared_name(), model);
        Ok(self)
    }

    /// Binds `class` to a relationship model.
    pub fn bind_relationship(&mut self, class: &EntityClass, model: ModelId) -> Result<&mut Self> {
        if !self.model(model).is_relationship() {
            return Err(Error::Schema(format!(
                "Bound model {} is not a relationship.",
                self.model(model),
            )));
        }
        if self.nodes.contains_key(class.name()) {
            return Err(Error::Schema(format!("Class '{}' is already bound to a node.", class.name())));
        }
        self.relationships.insert(class.shared_name(), model);
        Ok(self)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn for_class(&self, class: &EntityClass) -> Result<&Model> {
        self.for_class_name(class.name())
    }

    pub fn for_class_name(&self, class: &str) -> Result<&Model> {
        self.nodes
            .get(class)
            .or_else(|| self.relationships.get(class))
            .map(|id| self.model(*id))
            .ok_or_else(|| Error::Unmapped(format!("Unmapped class '{class}'.")))
    }

    pub fn for_object(&self, obj: &Entity) -> Result<&Model> {
        self.for_class(obj.class())
    }

    pub fn for_model_name(&self, model_name: &str) -> Result<&Model> {
        self.bound_models()
            .find(|model| model.name() == model_name)
            .ok_or_else(|| Error::Unmapped(format!("Unmapped model '{model_name}'.")))
    }

    /// The class bound to `model`.
    pub fn for_model(&self, model: ModelId) -> Result<&EntityClass> {
        let model = self.model(model);
        let bound = self.nodes.values().chain(self.relationships.values()).any(|id| *id == model.id());
        model
            .class()
            .filter(|_| bound)
            .ok_or_else(|| Error::Unmapped(format!("Unmapped model {model}.")))
    }

    /// The model whose storage key field in `raw` equals its name.
    ///
    /// Arbitrary graph records need not belong to a mapped model, so a miss
    /// is `None` rather than an error.
    pub fn for_dict(&self, raw: &PropertyMap) -> Option<&Model> {
        self.bound_models().find(|model| {
            matches!(raw.get(model.storage_key()), Some(Value::String(name)) if name == model.name())
        })
    }

    pub fn is_node(&self, obj: &Entity) -> bool {
        self.nodes.contains_key(obj.class().name())
    }

    pub fn is_relationship(&self, obj: &Entity) -> bool {
        self.relationships.contains_key(obj.class().name())
    }

    pub fn is_bind(&self, obj: &Entity) -> bool {
        self.is_node(obj) || self.is_relationship(obj)
    }

    /// Resolves a relation accessor declared on `class`.
    pub fn accessor(&self, class: &EntityClass, name: &str) -> Result<AccessorBinding> {
        self.accessors
            .get(class.name())
            .and_then(|table| table.get(name))
            .copied()
            .ok_or_else(|| Error::Unmapped(format!(
                "Class '{}' has no relation accessor '{name}'.",
                class.name(),
            )))
    }

    /// Node models first, then relationship models, in declaration order.
    fn bound_models(&self) -> impl Iterator<Item = &Model> {
        let bound = |model: &&Model| {
            model.class().is_some_and(|class| match model.kind() {
                ModelKind::Node => self.nodes.get(class.name()) == Some(&model.id()),
                ModelKind::Relationship => self.relationships.get(class.name()) == Some(&model.id()),
            })
        };
        let nodes = self.models.iter().filter(|m| m.is_node()).filter(bound);
        let rels = self.models.iter().filter(|m| m.is_relationship()).filter(bound);
        nodes.chain(rels)
    }

    // ========================================================================
    // Hydration
    // ========================================================================

    /// Builds an instance of the mapped class from a raw record.
    ///
    /// Returns `Ok(None)` when no model claims the record. A field that maps
    /// to no property of the model is an error.
    pub fn object_from_dict(&self, raw: &PropertyMap) -> Result<Option<Entity>> {
        let Some(model) = self.for_dict(raw) else {
            return Ok(None);
        };
        let class = self.for_model(model.id())?;
        let entity = class.instantiate();
        self.update_object(&entity, raw, model)?;
        Ok(Some(entity))
    }

    /// Copies store fields onto `obj` as application values.
    pub fn update_object(&self, obj: &Entity, raw: &PropertyMap, model: &Model) -> Result<()> {
        for (field, value_db) in raw {
            if field == model.storage_key() {
                continue;
            }
            if field == ID_FIELD {
                let id = ElementId::from_value(value_db)
                    .ok_or_else(|| Error::Identity(format!("Malformed identifier {value_db}.")))?;
                obj.set_id(id)?;
                continue;
            }
            let property = model.property_by_store_name(field).ok_or_else(|| Error::UnknownField {
                model: model.name().to_string(),
                field: field.clone(),
            })?;
            obj.set(property.name_py(), property.to_py(value_db)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::props;
    use crate::schema::{Property, ScalarType, SchemaBuilder};

    fn metadata() -> MetaData {
        let mut schema = SchemaBuilder::new();
        let website = schema
            .node("Website", [Property::new("name", ScalarType::string(127)).nullable(false)])
            .unwrap();
        let hosts = schema.relationship("hosts", []).unwrap();
        schema.register_class(website, EntityClass::new("Website")).unwrap();
        schema.register_class(hosts, EntityClass::new("WebsiteHostsPage")).unwrap();
        schema.build()
    }

    #[test]
    fn test_for_dict_resolves_by_storage_key() {
        let md = metadata();
        let raw = props([
            ("element_type", Value::from("Website")),
            ("_id", Value::Int(5)),
            ("name", Value::from("X")),
        ]);
        assert_eq!(md.for_dict(&raw).map(|m| m.name()), Some("Website"));

        let edge = props([("label", "hosts")]);
        assert_eq!(md.for_dict(&edge).map(|m| m.name()), Some("hosts"));
    }

    #[test]
    fn test_for_dict_miss_is_not_an_error() {
        let md = metadata();
        assert!(md.for_dict(&props([("element_type", "Recipe")])).is_none());
        assert!(md.for_dict(&PropertyMap::new()).is_none());
    }

    #[test]
    fn test_lookups_fail_fast() {
        let md = metadata();
        assert!(md.for_class(&EntityClass::new("Website")).is_ok());
        assert!(matches!(md.for_class(&EntityClass::new("Nope")), Err(Error::Unmapped(_))));
        assert!(matches!(md.for_model_name("Nope"), Err(Error::Unmapped(_))));
        assert_eq!(md.for_model_name("hosts").unwrap().name(), "hosts");
    }

    #[test]
    fn test_routing_predicates() {
        let md = metadata();
        let site = EntityClass::new("Website").instantiate();
        let rel = EntityClass::new("WebsiteHostsPage").instantiate();
        let stray = EntityClass::new("Stray").instantiate();
        assert!(md.is_node(&site) && !md.is_relationship(&site));
        assert!(md.is_relationship(&rel) && !md.is_node(&rel));
        assert!(!md.is_bind(&stray));
    }

    #[test]
    fn test_bind_kind_mismatch() {
        let mut md = metadata();
        let website = md.for_model_name("Website").unwrap().id();
        let hosts = md.for_model_name("hosts").unwrap().id();
        assert!(md.bind_relationship(&EntityClass::new("Other"), website).is_err());
        assert!(md.bind_node(&EntityClass::new("Other"), hosts).is_err());
        // A class cannot sit in both registries.
        assert!(md.bind_relationship(&EntityClass::new("Website"), hosts).is_err());
    }

    #[test]
    fn test_object_from_dict() {
        let md = metadata();
        let raw = props([
            ("element_type", Value::from("Website")),
            ("_id", Value::Int(5)),
            ("name", Value::from("X")),
        ]);
        let obj = md.object_from_dict(&raw).unwrap().unwrap();
        assert_eq!(obj.class().name(), "Website");
        assert_eq!(obj.id(), Some(ElementId(5)));
        assert_eq!(obj.get("name"), Value::from("X"));

        let unknown = props([("element_type", Value::from("Website")), ("color", Value::from("red"))]);
        assert!(matches!(md.object_from_dict(&unknown), Err(Error::UnknownField { .. })));
        assert!(md.object_from_dict(&props([("element_type", "Recipe")])).unwrap().is_none());
    }
}
