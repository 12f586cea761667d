//! Adjacency: a declared out-node / relationship / in-node triple.

use crate::element::Direction;
use super::ModelId;

/// Handle to an adjacency inside a `MetaData` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdjacencyId(pub(crate) usize);

/// Constraint linking two node models through one relationship model.
///
/// `unique` and `nullable` are declarative: they are carried for schema
/// tooling and never enforced by relation accessors or the unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjacency {
    out_node: ModelId,
    relationship: ModelId,
    in_node: ModelId,
    out_accessor: Option<String>,
    in_accessor: Option<String>,
    unique: bool,
    nullable: Option<bool>,
}

impl Adjacency {
    pub fn new(out_node: ModelId, relationship: ModelId, in_node: ModelId) -> Self {
        Self {
            out_node,
            relationship,
            in_node,
            out_accessor: None,
            in_accessor: None,
            unique: true,
            nullable: None,
        }
    }

    /// Whether a node may hold at most one relationship of this adjacency.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Whether a node may hold no relationship of this adjacency.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn out_node(&self) -> ModelId { self.out_node }
    pub fn relationship(&self) -> ModelId { self.relationship }
    pub fn in_node(&self) -> ModelId { self.in_node }
    pub fn is_unique(&self) -> bool { self.unique }
    pub fn is_nullable(&self) -> Option<bool> { self.nullable }
    pub fn out_accessor(&self) -> Option<&str> { self.out_accessor.as_deref() }
    pub fn in_accessor(&self) -> Option<&str> { self.in_accessor.as_deref() }

    /// Accessor name installed on the side facing `direction`.
    pub fn accessor(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Outgoing => self.out_accessor(),
            Direction::Incoming => self.in_accessor(),
        }
    }

    /// Accessor name on the opposite side.
    pub fn reverse_accessor(&self, direction: Direction) -> Option<&str> {
        self.accessor(direction.reverse())
    }

    /// Node model that owns an accessor facing `direction`.
    pub fn owner_model(&self, direction: Direction) -> ModelId {
        match direction {
            Direction::Outgoing => self.out_node,
            Direction::Incoming => self.in_node,
        }
    }

    /// Node model found at the far end of an accessor facing `direction`.
    pub fn endpoint_model(&self, direction: Direction) -> ModelId {
        self.owner_model(direction.reverse())
    }

    pub(crate) fn bind_accessor(&mut self, direction: Direction, name: &str) {
        let slot = match direction {
            Direction::Outgoing => &mut self.out_accessor,
            Direction::Incoming => &mut self.in_accessor,
        };
        *slot = Some(name.to_string());
    }

    pub(crate) fn is_self_adjacency(&self) -> bool {
        self.out_node == self.in_node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_sides() {
        let mut adj = Adjacency::new(ModelId(0), ModelId(2), ModelId(1)).unique(false);
        adj.bind_accessor(Direction::Outgoing, "hosts");
        adj.bind_accessor(Direction::Incoming, "isHostedBy");

        assert_eq!(adj.accessor(Direction::Outgoing), Some("hosts"));
        assert_eq!(adj.reverse_accessor(Direction::Outgoing), Some("isHostedBy"));
        assert_eq!(adj.owner_model(Direction::Incoming), ModelId(1));
        assert_eq!(adj.endpoint_model(Direction::Incoming), ModelId(0));
        assert!(!adj.is_unique());
        assert!(!adj.is_self_adjacency());
    }
}
