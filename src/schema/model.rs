//! Model: schema for one vertex kind (node) or one edge kind (relationship).

use std::collections::HashMap;
use std::fmt;

use crate::element::Direction;
use crate::entity::EntityClass;
use crate::{Error, Result};
use super::{Adjacency, AdjacencyId, Property};

/// Handle to a model inside a `MetaData` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub(crate) usize);

/// The two model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Node,
    Relationship,
}

impl ModelKind {
    /// Reserved field holding the model name in a raw record.
    pub fn storage_key(self) -> &'static str {
        match self {
            ModelKind::Node => "element_type",
            ModelKind::Relationship => "label",
        }
    }
}

/// Persistence and validation rules for one kind of graph element.
///
/// A model knows nothing about object construction; it is tied to an
/// [`EntityClass`] by `SchemaBuilder::map`.
#[derive(Debug, Clone)]
pub struct Model {
    id: ModelId,
    name: String,
    kind: ModelKind,
    properties: Vec<Property>,
    /// Application names of indexed properties, in declaration order.
    indices: Vec<String>,
    adjacencies: HashMap<String, AdjacencyId>,
    class: Option<EntityClass>,
}

impl Model {
    pub(crate) fn new(id: ModelId, name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            properties: Vec::new(),
            indices: Vec::new(),
            adjacencies: HashMap::new(),
            class: None,
        }
    }

    pub fn id(&self) -> ModelId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn kind(&self) -> ModelKind { self.kind }
    pub fn is_node(&self) -> bool { self.kind == ModelKind::Node }
    pub fn is_relationship(&self) -> bool { self.kind == ModelKind::Relationship }
    pub fn storage_key(&self) -> &'static str { self.kind.storage_key() }
    pub fn class(&self) -> Option<&EntityClass> { self.class.as_ref() }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name_py: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name_py() == name_py)
    }

    pub fn property_by_store_name(&self, name_db: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.store_name() == name_db)
    }

    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    /// Registers a property, applying store-name prefixing and recording
    /// its index.
    pub fn add_property(&mut self, mut prop: Property) -> Result<&mut Self> {
        if self.property(prop.name_py()).is_some() {
            return Err(Error::Schema(format!(
                "Cannot override previously set property '{}' on {self}.",
                prop.name_py(),
            )));
        }
        if prop.is_primary_key() && self.is_node() {
            return Err(Error::Schema(format!(
                "Only edge properties can be primary keys ('{}' on {self}).",
                prop.name_py(),
            )));
        }
        prop.attach(&self.name);
        if prop.is_indexed() {
            self.indices.push(prop.name_py().to_string());
        }
        self.properties.push(prop);
        Ok(self)
    }

    pub fn is_indexed(&self, name_py: &str) -> bool {
        self.indices.iter().any(|i| i == name_py)
    }

    /// Order-preserving subset of `names` that are indexed.
    pub fn useful_indices_among<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        names.into_iter().filter(|name| self.is_indexed(name)).collect()
    }

    // ========================================================================
    // Adjacencies
    // ========================================================================

    pub fn adjacencies(&self) -> impl Iterator<Item = (&str, AdjacencyId)> {
        self.adjacencies.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn adjacency(&self, name: &str) -> Option<AdjacencyId> {
        self.adjacencies.get(name).copied()
    }

    /// Binds `adjacency` to this model under accessor `name`.
    ///
    /// For a node, returns the direction of the accessor it must expose.
    /// A relationship only records the adjacency and returns `None`.
    pub fn add_adjacency(
        &mut self,
        id: AdjacencyId,
        adjacency: &mut Adjacency,
        name: &str,
    ) -> Result<Option<Direction>> {
        match self.kind {
            ModelKind::Node => {
                if adjacency.out_node() != self.id && adjacency.in_node() != self.id {
                    return Err(Error::Schema(format!(
                        "Adjacency '{name}' cannot be mapped to {self}.",
                    )));
                }
                // A self-adjacency exposes its out side first, then its in side.
                let direction = if adjacency.out_node() == self.id
                    && !(adjacency.is_self_adjacency() && adjacency.out_accessor().is_some())
                {
                    Direction::Outgoing
                } else {
                    Direction::Incoming
                };
                adjacency.bind_accessor(direction, name);
                self.adjacencies.insert(name.to_string(), id);
                Ok(Some(direction))
            }
            ModelKind::Relationship => {
                if adjacency.relationship() != self.id {
                    return Err(Error::Schema(format!(
                        "Adjacency '{name}' is declared over another relationship than {self}.",
                    )));
                }
                self.adjacencies.insert(name.to_string(), id);
                Ok(None)
            }
        }
    }

    pub(crate) fn set_class(&mut self, class: EntityClass) {
        self.class = Some(class);
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ModelKind::Node => write!(f, "({})", self.name),
            ModelKind::Relationship => write!(f, "-[:{}]->", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarType;

    fn website() -> Model {
        let mut model = Model::new(ModelId(0), "Website", ModelKind::Node);
        model
            .add_property(Property::new("name", ScalarType::string(127)).indexed(true))
            .unwrap()
            .add_property(Property::new("domain", ScalarType::url(2801)))
            .unwrap()
            .add_property(Property::new("content", ScalarType::string(1024)).indexed(true))
            .unwrap();
        model
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let mut model = website();
        let err = model
            .add_property(Property::new("name", ScalarType::string(10)))
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert_eq!(model.properties().len(), 3);
    }

    #[test]
    fn test_primary_key_only_on_relationship() {
        let mut node = Model::new(ModelId(0), "Page", ModelKind::Node);
        assert!(node.add_property(Property::new("k", ScalarType::Integer).primary_key(true)).is_err());

        let mut rel = Model::new(ModelId(1), "hosts", ModelKind::Relationship);
        assert!(rel.add_property(Property::new("k", ScalarType::Integer).primary_key(true)).is_ok());
    }

    #[test]
    fn test_useful_indices_preserve_order() {
        let model = website();
        assert_eq!(
            model.useful_indices_among(["domain", "content", "name"]),
            vec!["content", "name"],
        );
        assert!(model.useful_indices_among(["domain"]).is_empty());
    }

    #[test]
    fn test_node_adjacency_direction() {
        let mut site = Model::new(ModelId(0), "Website", ModelKind::Node);
        let mut page = Model::new(ModelId(1), "Page", ModelKind::Node);
        let mut other = Model::new(ModelId(3), "Other", ModelKind::Node);
        let mut adj = Adjacency::new(ModelId(0), ModelId(2), ModelId(1));

        let id = AdjacencyId(0);
        assert_eq!(site.add_adjacency(id, &mut adj, "hosts").unwrap(), Some(Direction::Outgoing));
        assert_eq!(page.add_adjacency(id, &mut adj, "isHostedBy").unwrap(), Some(Direction::Incoming));
        assert!(other.add_adjacency(id, &mut adj, "nope").is_err());
        assert_eq!(adj.out_accessor(), Some("hosts"));
        assert_eq!(adj.in_accessor(), Some("isHostedBy"));
    }

    #[test]
    fn test_self_adjacency_binds_both_sides() {
        let mut person = Model::new(ModelId(0), "Person", ModelKind::Node);
        let mut adj = Adjacency::new(ModelId(0), ModelId(1), ModelId(0));
        let id = AdjacencyId(0);
        assert_eq!(person.add_adjacency(id, &mut adj, "follows").unwrap(), Some(Direction::Outgoing));
        assert_eq!(person.add_adjacency(id, &mut adj, "followedBy").unwrap(), Some(Direction::Incoming));
    }

    #[test]
    fn test_relationship_adjacency_must_match() {
        let mut hosts = Model::new(ModelId(2), "hosts", ModelKind::Relationship);
        let mut adj = Adjacency::new(ModelId(0), ModelId(2), ModelId(1));
        let mut foreign = Adjacency::new(ModelId(0), ModelId(5), ModelId(1));
        assert_eq!(hosts.add_adjacency(AdjacencyId(0), &mut adj, "hosts").unwrap(), None);
        assert!(hosts.add_adjacency(AdjacencyId(1), &mut foreign, "other").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(website().to_string(), "(Website)");
        let rel = Model::new(ModelId(1), "hosts", ModelKind::Relationship);
        assert_eq!(rel.to_string(), "-[:hosts]->");
        assert_eq!(rel.storage_key(), "label");
    }
}
