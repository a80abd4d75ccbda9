use std::collections::HashMap;

use glam::Vec2;

use crate::state::{EntityId, WorldIndexes};

use super::ArenaComponents;

const CELL_SIZE: f32 = 4.0;

fn cell_of(position: Vec2) -> (i32, i32) {
    (
        (position.x / CELL_SIZE).floor() as i32,
        (position.y / CELL_SIZE).floor() as i32,
    )
}

/// Spatial hash over entity positions, rebuilt at the end of every tick so
/// queries during the next tick see last-committed positions consistently on
/// server and client.
#[derive(Debug, Default)]
pub struct ArenaIndexes {
    cells: HashMap<(i32, i32), Vec<EntityId>>,
}

impl ArenaIndexes {
    fn insert(&mut self, id: EntityId, position: Vec2) {
        self.cells.entry(cell_of(position)).or_default().push(id);
    }

    fn remove(&mut self, id: EntityId) {
        self.cells.retain(|_, ids| {
            ids.retain(|&other| other != id);
            !ids.is_empty()
        });
    }

    /// Ids whose indexed position lies within `radius` of `center`, in
    /// ascending id order. Sorting keeps query results deterministic across
    /// hash-map cell ordering.
    pub fn query_circle(&self, components: &ArenaComponents, center: Vec2, radius: f32) -> Vec<EntityId> {
        let min = cell_of(center - Vec2::splat(radius));
        let max = cell_of(center + Vec2::splat(radius));
        let mut hits = Vec::new();
        for cx in min.0..=max.0 {
            for cy in min.1..=max.1 {
                let Some(ids) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for &id in ids {
                    let Some(transform) = components.transforms.get(id) else {
                        continue;
                    };
                    if transform.position.distance_squared(center) <= radius * radius {
                        hits.push(id);
                    }
                }
            }
        }
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

impl WorldIndexes<ArenaComponents> for ArenaIndexes {
    fn index_entity(&mut self, id: EntityId, components: &ArenaComponents) {
        if let Some(transform) = components.transforms.get(id) {
            self.insert(id, transform.position);
        }
    }

    fn unindex_entity(&mut self, id: EntityId, _components: &ArenaComponents) {
        self.remove(id);
    }

    fn frame_update(&mut self, components: &ArenaComponents) {
        self.cells.clear();
        for (id, transform) in components.transforms.iter() {
            self.insert(id, transform.position);
        }
    }
}
