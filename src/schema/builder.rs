//! Build-time class binding: models, adjacencies and classes in, immutable
//! `MetaData` out.

use tracing::trace;

use crate::entity::EntityClass;
use crate::{Error, Result};
use super::{AccessorBinding, Adjacency, AdjacencyId, MetaData, Model, ModelId, ModelKind, Property};

/// Declares a schema and binds it to entity classes.
///
/// ```rust
/// use graph_ogm::entity::EntityClass;
/// use graph_ogm::schema::{Adjacency, Property, ScalarType, SchemaBuilder};
///
/// # fn main() -> graph_ogm::Result<()> {
/// let mut schema = SchemaBuilder::new();
/// let website = schema.node("Website", [Property::new("name", ScalarType::string(127))])?;
/// let page = schema.node("Page", [Property::new("title", ScalarType::string(127))])?;
/// let hosts = schema.relationship("hosts", [])?;
/// let adj = schema.adjacency(Adjacency::new(website, hosts, page).unique(false));
///
/// schema.map(EntityClass::new("WebsiteHostsPage"), hosts, [])?;
/// schema.map(EntityClass::new("Page"), page, [("isHostedBy", adj)])?;
/// schema.map(EntityClass::new("Website"), website, [("hosts", adj)])?;
/// let metadata = schema.build();
/// assert_eq!(metadata.for_model_name("Page")?.name(), "Page");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    metadata: MetaData,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a vertex model.
    pub fn node(&mut self, name: &str, properties: impl IntoIterator<Item = Property>) -> Result<ModelId> {
        self.model(name, ModelKind::Node, properties)
    }

    /// Declares an edge model.
    pub fn relationship(&mut self, name: &str, properties: impl IntoIterator<Item = Property>) -> Result<ModelId> {
        self.model(name, ModelKind::Relationship, properties)
    }

    fn model(
        &mut self,
        name: &str,
        kind: ModelKind,
        properties: impl IntoIterator<Item = Property>,
    ) -> Result<ModelId> {
        if self.metadata.models().any(|m| m.name() == name && m.kind() == kind) {
            return Err(Error::Schema(format!("Model '{name}' is already declared.")));
        }
        let mut model = Model::new(self.metadata.next_model_id(), name, kind);
        for prop in properties {
            model.add_property(prop)?;
        }
        Ok(self.metadata.push_model(model))
    }

    /// Mutable access to a declared model, e.g. to add properties later.
    pub fn model_mut(&mut self, id: ModelId) -> &mut Model {
        self.metadata.model_mut(id)
    }

    pub fn adjacency(&mut self, adjacency: Adjacency) -> AdjacencyId {
        self.metadata.push_adjacency(adjacency)
    }

    /// Ties `class` to `model` in the registry matching the model's kind.
    pub fn register_class(&mut self, model: ModelId, class: EntityClass) -> Result<()> {
        match self.metadata.model(model).kind() {
            ModelKind::Node => self.metadata.bind_node(&class, model)?,
            ModelKind::Relationship => self.metadata.bind_relationship(&class, model)?,
        };
        self.metadata.model_mut(model).set_class(class);
        Ok(())
    }

    /// Binds `adjacency` to `model` under `name`; node models also get a
    /// relation accessor installed on their class.
    pub fn add_adjacency(&mut self, model: ModelId, adjacency: AdjacencyId, name: &str) -> Result<()> {
        let target = self.metadata.model(model);
        let class = target.class().cloned();
        if target.is_node() && class.is_none() {
            return Err(Error::Schema(format!(
                "Cannot install accessor '{name}': no class is bound to {target}.",
            )));
        }
        let (target, adj) = self.metadata.model_and_adjacency_mut(model, adjacency);
        let (Some(direction), Some(class)) = (target.add_adjacency(adjacency, adj, name)?, class) else {
            return Ok(());
        };
        trace!(class = class.name(), accessor = name, ?direction, "schema.accessor.install");
        self.metadata.install_accessor(&class, name, AccessorBinding { adjacency, direction });
        Ok(())
    }

    /// Class binding: registers `class` on `model`, then binds every
    /// `(accessor, adjacency)` pair on the model and on the adjacency's
    /// relationship model. Either side may be mapped first.
    pub fn map<'a>(
        &mut self,
        class: EntityClass,
        model: ModelId,
        accessors: impl IntoIterator<Item = (&'a str, AdjacencyId)>,
    ) -> Result<()> {
        self.register_class(model, class)?;
        for (name, adjacency) in accessors {
            self.add_adjacency(model, adjacency, name)?;
            let relationship = self.metadata.adjacency(adjacency).relationship();
            if relationship != model {
                self.add_adjacency(relationship, adjacency, name)?;
            }
        }
        Ok(())
    }

    pub fn build(self) -> MetaData {
        self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Direction;
    use crate::schema::ScalarType;

    #[test]
    fn test_map_installs_accessors() {
        let mut schema = SchemaBuilder::new();
        let website = schema.node("Website", []).unwrap();
        let page = schema.node("Page", []).unwrap();
        let hosts = schema.relationship("hosts", []).unwrap();
        let adj = schema.adjacency(Adjacency::new(website, hosts, page));

        // Node side first, relationship class last.
        schema.map(EntityClass::new("Page"), page, [("isHostedBy", adj)]).unwrap();
        schema.map(EntityClass::new("Website"), website, [("hosts", adj)]).unwrap();
        schema.map(EntityClass::new("WebsiteHostsPage"), hosts, []).unwrap();
        let md = schema.build();

        let out = md.accessor(&EntityClass::new("Website"), "hosts").unwrap();
        assert_eq!(out.direction, Direction::Outgoing);
        let inward = md.accessor(&EntityClass::new("Page"), "isHostedBy").unwrap();
        assert_eq!(inward.direction, Direction::Incoming);
        assert_eq!(md.adjacency(adj).out_accessor(), Some("hosts"));
        assert_eq!(md.adjacency(adj).in_accessor(), Some("isHostedBy"));
        assert!(md.model(hosts).adjacency("hosts").is_some());
    }

    #[test]
    fn test_adjacency_on_unrelated_node_fails() {
        let mut schema = SchemaBuilder::new();
        let website = schema.node("Website", []).unwrap();
        let page = schema.node("Page", []).unwrap();
        let recipe = schema.node("Recipe", []).unwrap();
        let hosts = schema.relationship("hosts", []).unwrap();
        let adj = schema.adjacency(Adjacency::new(website, hosts, page));
        let err = schema.map(EntityClass::new("Recipe"), recipe, [("hosts", adj)]).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_accessor_requires_bound_class() {
        let mut schema = SchemaBuilder::new();
        let website = schema.node("Website", []).unwrap();
        let page = schema.node("Page", []).unwrap();
        let hosts = schema.relationship("hosts", []).unwrap();
        let adj = schema.adjacency(Adjacency::new(website, hosts, page));
        assert!(schema.add_adjacency(website, adj, "hosts").is_err());

        // The failed binding left nothing behind.
        let md = schema.build();
        assert_eq!(md.adjacency(adj).out_accessor(), None);
        assert_eq!(md.model(website).adjacency("hosts"), None);
    }

    #[test]
    fn test_duplicate_property_in_declaration() {
        let mut schema = SchemaBuilder::new();
        let err = schema
            .node("Page", [
                Property::new("title", ScalarType::string(10)),
                Property::new("title", ScalarType::string(20)),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));

        // No half-built model was registered, so the name is still free.
        let page = schema.node("Page", [Property::new("title", ScalarType::string(20))]).unwrap();
        let md = schema.build();
        assert_eq!(md.models().count(), 1);
        assert_eq!(md.model(page).properties().len(), 1);
    }
}
