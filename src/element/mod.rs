//! # Element DTOs
//!
//! Plain data that crosses every boundary: entity attributes, instance
//! snapshots, store payloads and raw records.
//!
//! Design rule: no schema knowledge, no entity handles here.
//! This module is pure data: no I/O, no state.

pub mod value;
pub mod property_map;
pub mod record;

pub use value::Value;
pub use property_map::{PropertyMap, props};
pub use record::{ElementId, ElementKind, Record, ID_FIELD};

use serde::{Deserialize, Serialize};

/// Side of an adjacency a relation accessor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The owner is the out-vertex of the relationship.
    Outgoing,
    /// The owner is the in-vertex of the relationship.
    Incoming,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
        }
    }
}
