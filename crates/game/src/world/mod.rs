pub mod components;
mod indexes;

pub use indexes::ArenaIndexes;

use glam::Vec2;

use crate::state::{ComponentSet, ComponentTable, EntityId, EntitySet, StateDb, Store};

use components::{Bullet, Damageable, Pickup, PickupKind, Tank, TankMover, Transform, Weapon};

/// Half-width of the square arena; walls clamp tank movement here.
pub const ARENA_HALF_EXTENT: f32 = 20.0;
/// Bullets past this distance from center are despawned.
pub const BULLET_BOUND: f32 = ARENA_HALF_EXTENT + 2.0;

pub const TANK_SPEED: f32 = 6.0;
pub const TANK_HEALTH: i32 = 100;
pub const TANK_HITBOX: f32 = 0.8;

pub const DASH_SPEED: f32 = 18.0;
pub const DASH_DURATION_FRAMES: u32 = 6;
pub const DASH_COOLDOWN_FRAMES: u32 = 45;

pub const BULLET_SPEED: f32 = 24.0;
pub const PICKUP_RADIUS: f32 = 1.0;
pub const PICKUP_HEAL: i32 = 50;

/// The arena game mode's component bundle.
#[derive(Default)]
pub struct ArenaComponents {
    pub transforms: ComponentTable<Transform>,
    pub movers: ComponentTable<TankMover>,
    pub tanks: ComponentTable<Tank>,
    pub damageables: ComponentTable<Damageable>,
    pub bullets: ComponentTable<Bullet>,
    pub pickups: ComponentTable<Pickup>,
    /// Tanks inside a dash window take no damage.
    pub invulnerable: EntitySet,
}

/// Registration payload: one optional slot per component kind.
#[derive(Debug, Default)]
pub struct EntityConfig {
    pub transform: Option<Transform>,
    pub mover: Option<TankMover>,
    pub tank: Option<Tank>,
    pub damageable: Option<Damageable>,
    pub bullet: Option<Bullet>,
    pub pickup: Option<Pickup>,
    pub invulnerable: bool,
}

impl EntityConfig {
    pub fn tank(player_number: u8, spawn: Vec2) -> Self {
        Self {
            transform: Some(Transform::at(spawn)),
            mover: Some(TankMover::default()),
            tank: Some(Tank::new(player_number)),
            damageable: Some(Damageable::new(TANK_HEALTH, TANK_HITBOX)),
            ..Self::default()
        }
    }

    pub fn bullet(position: Vec2, velocity: Vec2, owner: EntityId, damage: i32) -> Self {
        let mut transform = Transform::at(position);
        transform.orientation = velocity.y.atan2(velocity.x);
        Self {
            transform: Some(transform),
            bullet: Some(Bullet {
                velocity,
                owner,
                damage,
            }),
            ..Self::default()
        }
    }

    pub fn pickup(position: Vec2, kind: PickupKind) -> Self {
        Self {
            transform: Some(Transform::at(position)),
            pickup: Some(Pickup { kind }),
            ..Self::default()
        }
    }
}

impl ComponentSet for ArenaComponents {
    type Config = EntityConfig;

    fn populate(&mut self, id: EntityId, config: EntityConfig) {
        if let Some(transform) = config.transform {
            self.transforms.set(id, transform);
        }
        if let Some(mover) = config.mover {
            self.movers.set(id, mover);
        }
        if let Some(tank) = config.tank {
            self.tanks.set(id, tank);
        }
        if let Some(damageable) = config.damageable {
            self.damageables.set(id, damageable);
        }
        if let Some(bullet) = config.bullet {
            self.bullets.set(id, bullet);
        }
        if let Some(pickup) = config.pickup {
            self.pickups.set(id, pickup);
        }
        if config.invulnerable {
            self.invulnerable.insert(id);
        }
    }

    fn each_store(&mut self, visit: &mut dyn FnMut(&mut dyn Store)) {
        visit(&mut self.transforms);
        visit(&mut self.movers);
        visit(&mut self.tanks);
        visit(&mut self.damageables);
        visit(&mut self.bullets);
        visit(&mut self.pickups);
        visit(&mut self.invulnerable);
    }
}

pub type ArenaDb = StateDb<ArenaComponents, ArenaIndexes>;

/// Corner spawn point for a player slot. Shared by `spawn_match` and any
/// respawn logic so placement stays identical on server and client.
pub fn spawn_point(player_number: u8) -> Vec2 {
    let offset = ARENA_HALF_EXTENT - 4.0;
    match player_number % 4 {
        0 => Vec2::new(-offset, -offset),
        1 => Vec2::new(offset, offset),
        2 => Vec2::new(-offset, offset),
        _ => Vec2::new(offset, -offset),
    }
}

/// Registers and commits the initial match state: one tank per player plus a
/// center repair pickup. Server and clients both run this, so all peers start
/// the frame-0 simulation from an identical committed baseline.
pub fn spawn_match(db: &mut ArenaDb, player_count: usize) {
    for player_number in 0..player_count as u8 {
        db.register_entity(EntityConfig::tank(player_number, spawn_point(player_number)));
    }
    db.register_entity(EntityConfig::pickup(Vec2::ZERO, PickupKind::Repair));
    db.commit_prediction();
}

/// Looks up the entity carrying `player_number`'s tank.
pub fn tank_of_player(components: &ArenaComponents, player_number: u8) -> Option<EntityId> {
    components
        .tanks
        .iter()
        .find(|(_, tank)| tank.player_number == player_number)
        .map(|(id, _)| id)
}

/// True while `frame` falls inside the dash window started at `last_dash_frame`.
pub fn dash_active(mover: &TankMover, frame: u32) -> bool {
    mover
        .last_dash_frame
        .is_some_and(|start| frame.wrapping_sub(start) < DASH_DURATION_FRAMES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_match_is_deterministic() {
        let mut a = ArenaDb::new();
        let mut b = ArenaDb::new();
        spawn_match(&mut a, 2);
        spawn_match(&mut b, 2);

        assert_eq!(a.next_id(), b.next_id());
        let positions = |db: &ArenaDb| -> Vec<(u32, Vec2)> {
            db.components
                .transforms
                .iter()
                .map(|(id, t)| (id.0, t.position))
                .collect()
        };
        assert_eq!(positions(&a), positions(&b));
        assert_eq!(a.components.tanks.len(), 2);
        assert_eq!(a.components.pickups.len(), 1);
    }

    #[test]
    fn tank_lookup_by_player_number() {
        let mut db = ArenaDb::new();
        spawn_match(&mut db, 2);
        let id0 = tank_of_player(&db.components, 0).unwrap();
        let id1 = tank_of_player(&db.components, 1).unwrap();
        assert_ne!(id0, id1);
        assert!(tank_of_player(&db.components, 7).is_none());
    }

    #[test]
    fn spawn_points_are_distinct() {
        let points: Vec<Vec2> = (0..4).map(spawn_point).collect();
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert!(points[i].distance(points[j]) > 1.0);
            }
        }
    }
}
