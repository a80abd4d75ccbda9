use std::collections::{BTreeSet, HashSet};

use super::EntityId;

/// Transactional existence set, used where only membership is tracked (tag
/// components such as "currently invulnerable"). Same commit/rollback
/// contract as [`super::ComponentTable`], without values.
#[derive(Debug, Default)]
pub struct EntitySet {
    present: BTreeSet<EntityId>,
    added: HashSet<EntityId>,
    removed: HashSet<EntityId>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id`. Returns false if already a member. Re-adding an id removed
    /// earlier in the same window cancels the removal instead of recording a
    /// fresh add, so rollback restores the committed membership exactly.
    pub fn insert(&mut self, id: EntityId) -> bool {
        if self.present.contains(&id) {
            return false;
        }
        if !self.removed.remove(&id) {
            self.added.insert(id);
        }
        self.present.insert(id)
    }

    /// Removes `id`. Returns false if not a member; deleting a non-member is
    /// a no-op by design.
    pub fn remove(&mut self, id: EntityId) -> bool {
        if !self.present.remove(&id) {
            return false;
        }
        if !self.added.remove(&id) {
            self.removed.insert(id);
        }
        true
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.present.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Members in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.present.iter().copied()
    }

    pub fn commit(&mut self) {
        self.added.clear();
        self.removed.clear();
    }

    /// Re-adds window removals, then drops window adds.
    pub fn rollback(&mut self) {
        for id in self.removed.drain() {
            self.present.insert(id);
        }
        for id in self.added.drain() {
            self.present.remove(&id);
        }
    }
}
