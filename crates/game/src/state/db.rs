use std::collections::BTreeSet;

use super::{ComponentTable, EntityId, EntitySet};

/// Common transactional surface of [`ComponentTable`] and [`EntitySet`],
/// letting [`StateDb`] drive heterogeneous tables uniformly.
pub trait Store {
    fn commit(&mut self);
    fn rollback(&mut self);
    /// Removes `id` from this table, with the usual lazy snapshot so a later
    /// rollback resurrects it. Returns false if the id was absent.
    fn purge(&mut self, id: EntityId) -> bool;
}

impl<T: Clone> Store for ComponentTable<T> {
    fn commit(&mut self) {
        ComponentTable::commit(self);
    }

    fn rollback(&mut self) {
        ComponentTable::rollback(self);
    }

    fn purge(&mut self, id: EntityId) -> bool {
        self.remove(id)
    }
}

impl Store for EntitySet {
    fn commit(&mut self) {
        EntitySet::commit(self);
    }

    fn rollback(&mut self) {
        EntitySet::rollback(self);
    }

    fn purge(&mut self, id: EntityId) -> bool {
        self.remove(id)
    }
}

/// The per-game-mode bundle of component tables and sets.
pub trait ComponentSet: Default {
    /// Registration payload: which components a new entity starts with.
    type Config;

    /// Writes `config` into the relevant tables for a freshly allocated id.
    fn populate(&mut self, id: EntityId, config: Self::Config);

    /// Visits every owned table/set.
    fn each_store(&mut self, visit: &mut dyn FnMut(&mut dyn Store));
}

/// Secondary-index hooks a game mode hangs off the entity lifecycle
/// (spatial indexes, pathfinding grids, ...).
pub trait WorldIndexes<C>: Default {
    fn index_entity(&mut self, id: EntityId, components: &C);
    fn unindex_entity(&mut self, id: EntityId, components: &C);
    /// End-of-tick maintenance, after deferred deletions are applied.
    fn frame_update(&mut self, components: &C);
}

/// Aggregates a game mode's tables behind one atomic commit/rollback window.
///
/// At most one uncommitted window is open at a time. During a window, systems
/// register and mutate entities freely; deletions are deferred to
/// [`StateDb::post_frame_update`] so every system sees this tick's component
/// state. `commit_prediction` finalizes the window across all tables at once;
/// `undo_prediction` discards it in O(entities touched), which is what makes
/// per-render-frame client rollback affordable.
#[derive(Debug)]
pub struct StateDb<C, X> {
    pub components: C,
    pub indexes: X,
    next_id_committed: u32,
    next_id_uncommitted: u32,
    pending_deletions: BTreeSet<EntityId>,
    predicted_registrations: BTreeSet<EntityId>,
    predicted_deletions: BTreeSet<EntityId>,
}

impl<C: ComponentSet, X: WorldIndexes<C>> Default for StateDb<C, X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ComponentSet, X: WorldIndexes<C>> StateDb<C, X> {
    pub fn new() -> Self {
        Self {
            components: C::default(),
            indexes: X::default(),
            next_id_committed: 0,
            next_id_uncommitted: 0,
            pending_deletions: BTreeSet::new(),
            predicted_registrations: BTreeSet::new(),
            predicted_deletions: BTreeSet::new(),
        }
    }

    /// Allocates an id, populates component tables from `config`, and indexes
    /// the entity. The id is handed out from the uncommitted counter so game
    /// logic can reference the new entity within the same tick; rollback
    /// abandons it (ids are never reused, but an id that never committed can
    /// be re-handed-out after the counter resets).
    pub fn register_entity(&mut self, config: C::Config) -> EntityId {
        let id = EntityId(self.next_id_uncommitted);
        self.next_id_uncommitted += 1;
        self.components.populate(id, config);
        self.indexes.index_entity(id, &self.components);
        self.predicted_registrations.insert(id);
        id
    }

    /// Defers deletion of `id` to the end of the tick. Tables are untouched
    /// until [`StateDb::post_frame_update`]; marking twice is harmless.
    pub fn mark_for_deletion(&mut self, id: EntityId) {
        self.pending_deletions.insert(id);
    }

    pub fn is_pending_deletion(&self, id: EntityId) -> bool {
        self.pending_deletions.contains(&id)
    }

    /// Atomically finalizes the open window across every table.
    pub fn commit_prediction(&mut self) {
        self.components.each_store(&mut |store| store.commit());
        self.next_id_committed = self.next_id_uncommitted;
        self.predicted_registrations.clear();
        self.predicted_deletions.clear();
    }

    /// Atomically discards the open window, restoring the last committed
    /// state exactly. Entities registered in the window are unindexed while
    /// their component data still exists; entities deleted in the window are
    /// re-indexed after rollback resurrects them.
    pub fn undo_prediction(&mut self) {
        for &id in &self.predicted_registrations {
            self.indexes.unindex_entity(id, &self.components);
        }
        self.components.each_store(&mut |store| store.rollback());
        for &id in &self.predicted_deletions {
            self.indexes.index_entity(id, &self.components);
        }
        self.predicted_registrations.clear();
        self.predicted_deletions.clear();
        self.pending_deletions.clear();
        self.next_id_uncommitted = self.next_id_committed;
    }

    /// Applies deferred deletions and runs index maintenance. Runs as the
    /// final step of every simulated tick, after all systems have read this
    /// tick's component state.
    pub fn post_frame_update(&mut self) {
        let pending = std::mem::take(&mut self.pending_deletions);
        for id in pending {
            self.indexes.unindex_entity(id, &self.components);
            self.components.each_store(&mut |store| {
                store.purge(id);
            });
            if !self.predicted_registrations.remove(&id) {
                // Deleted a committed entity: remember it so a rollback can
                // re-index the resurrected components.
                self.predicted_deletions.insert(id);
            }
        }
        self.indexes.frame_update(&self.components);
    }

    pub fn next_id(&self) -> u32 {
        self.next_id_uncommitted
    }

    pub fn committed_next_id(&self) -> u32 {
        self.next_id_committed
    }
}
