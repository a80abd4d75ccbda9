use std::collections::{HashMap, HashSet};

use super::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("no component for entity {0}")]
    NotFound(EntityId),
}

/// Transactional map from [`EntityId`] to a component value.
///
/// Values live in an arena of slots indexed by id; mutations since the last
/// commit are tracked in a side table so `rollback` only touches the ids that
/// were actually written. Snapshots are taken lazily, the first time an id is
/// updated or removed inside the current uncommitted window. Ids inserted in
/// the current window need no snapshot: rolling back an insert is removal.
#[derive(Debug)]
pub struct ComponentTable<T> {
    slots: Vec<Option<T>>,
    added: HashSet<EntityId>,
    snapshot: HashMap<EntityId, T>,
}

impl<T> Default for ComponentTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComponentTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            added: HashSet::new(),
            snapshot: HashMap::new(),
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn has(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    /// Iterates `(id, value)` pairs in ascending id order. The order is a
    /// determinism requirement: server and client must visit entities
    /// identically given identical committed state.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (EntityId(index as u32), value)))
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|(id, _)| id).collect()
    }

    fn grow_to(&mut self, id: EntityId) {
        if self.slots.len() <= id.index() {
            self.slots.resize_with(id.index() + 1, || None);
        }
    }
}

impl<T: Clone> ComponentTable<T> {
    /// Inserts or overwrites the value for `id`. A fresh id is recorded as an
    /// uncommitted add; overwriting a live committed value snapshots it first
    /// so rollback restores it rather than dropping the id.
    pub fn set(&mut self, id: EntityId, value: T) {
        self.grow_to(id);
        let slot = &mut self.slots[id.index()];
        match slot.take() {
            Some(previous) => {
                if !self.added.contains(&id) {
                    self.snapshot.entry(id).or_insert(previous);
                }
            }
            None => {
                if !self.snapshot.contains_key(&id) {
                    self.added.insert(id);
                }
            }
        }
        *slot = Some(value);
    }

    /// Mutates the value for `id` in place. Absence is a logic error: it means
    /// a system ran outside its declared component-presence order.
    pub fn update(&mut self, id: EntityId, apply: impl FnOnce(&mut T)) -> Result<(), ComponentError> {
        let Some(current) = self.slots.get(id.index()).and_then(Option::as_ref) else {
            return Err(ComponentError::NotFound(id));
        };
        if !self.added.contains(&id) && !self.snapshot.contains_key(&id) {
            self.snapshot.insert(id, current.clone());
        }
        if let Some(value) = self.slots[id.index()].as_mut() {
            apply(value);
        }
        Ok(())
    }

    /// Removes the value for `id`. Returns false if absent; removing an
    /// already-removed id is not an error, systems may race on deletion
    /// within a tick.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            return false;
        };
        let Some(value) = slot.take() else {
            return false;
        };
        if !self.added.remove(&id) {
            self.snapshot.entry(id).or_insert(value);
        }
        true
    }

    /// Makes everything written since the last commit the new baseline.
    pub fn commit(&mut self) {
        self.added.clear();
        self.snapshot.clear();
    }

    /// Restores the table to its state at the last commit: snapshotted values
    /// are re-inserted (undoing updates and removes), then uncommitted adds
    /// are dropped.
    pub fn rollback(&mut self) {
        for (id, value) in self.snapshot.drain() {
            self.slots[id.index()] = Some(value);
        }
        for id in self.added.drain() {
            self.slots[id.index()] = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ComponentTable<i32> {
        ComponentTable::new()
    }

    #[test]
    fn set_then_rollback_removes() {
        let mut t = table();
        t.set(EntityId(0), 7);
        assert_eq!(t.get(EntityId(0)), Some(&7));
        t.rollback();
        assert!(!t.has(EntityId(0)));
    }

    #[test]
    fn update_then_rollback_restores() {
        let mut t = table();
        t.set(EntityId(3), 1);
        t.commit();
        t.update(EntityId(3), |v| *v = 99).unwrap();
        assert_eq!(t.get(EntityId(3)), Some(&99));
        t.rollback();
        assert_eq!(t.get(EntityId(3)), Some(&1));
    }

    #[test]
    fn commit_finalizes_update() {
        let mut t = table();
        t.set(EntityId(0), 1);
        t.commit();
        t.update(EntityId(0), |v| *v = 2).unwrap();
        t.commit();
        t.rollback();
        assert_eq!(t.get(EntityId(0)), Some(&2));
    }

    #[test]
    fn snapshot_is_first_touch_only() {
        let mut t = table();
        t.set(EntityId(0), 1);
        t.commit();
        t.update(EntityId(0), |v| *v = 2).unwrap();
        t.update(EntityId(0), |v| *v = 3).unwrap();
        t.remove(EntityId(0));
        t.rollback();
        assert_eq!(t.get(EntityId(0)), Some(&1));
    }

    #[test]
    fn update_absent_is_an_error() {
        let mut t = table();
        assert!(matches!(
            t.update(EntityId(5), |v| *v = 1),
            Err(ComponentError::NotFound(EntityId(5)))
        ));
    }

    #[test]
    fn remove_absent_is_idempotent() {
        let mut t = table();
        assert!(!t.remove(EntityId(2)));
        t.set(EntityId(2), 4);
        assert!(t.remove(EntityId(2)));
        assert!(!t.remove(EntityId(2)));
    }

    #[test]
    fn remove_committed_then_rollback_resurrects() {
        let mut t = table();
        t.set(EntityId(1), 10);
        t.commit();
        assert!(t.remove(EntityId(1)));
        assert!(!t.has(EntityId(1)));
        t.rollback();
        assert_eq!(t.get(EntityId(1)), Some(&10));
    }

    #[test]
    fn add_then_remove_in_window_rolls_back_clean() {
        let mut t = table();
        t.set(EntityId(0), 1);
        t.commit();
        t.set(EntityId(1), 2);
        t.remove(EntityId(1));
        t.rollback();
        assert_eq!(t.get(EntityId(0)), Some(&1));
        assert!(!t.has(EntityId(1)));
    }

    #[test]
    fn overwrite_committed_value_survives_rollback() {
        let mut t = table();
        t.set(EntityId(0), 1);
        t.commit();
        t.set(EntityId(0), 2);
        t.rollback();
        assert_eq!(t.get(EntityId(0)), Some(&1));
    }

    #[test]
    fn iteration_is_ascending_by_id() {
        let mut t = table();
        t.set(EntityId(4), 40);
        t.set(EntityId(0), 0);
        t.set(EntityId(2), 20);
        let ids: Vec<u32> = t.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![0, 2, 4]);
    }
}
