mod db;
mod set;
mod table;

pub use db::{ComponentSet, StateDb, Store, WorldIndexes};
pub use set::EntitySet;
pub use table::{ComponentError, ComponentTable};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an entity. Ids are allocated monotonically per world and are
/// never reused, even after the entity is deleted. "An entity" is nothing but
/// an id plus whatever components the tables hold for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
