use glam::Vec2;

use crate::state::EntityId;

/// Position and facing. `previous_position` is snapshotted by the first
/// pipeline system each tick, before any mover writes `position`, so
/// consumers can interpolate between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub previous_position: Vec2,
    pub orientation: f32,
}

impl Transform {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            previous_position: position,
            orientation: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Damageable {
    pub health: i32,
    pub max_health: i32,
    /// Hit radius around the transform position.
    pub hitbox: f32,
}

impl Damageable {
    pub fn new(max_health: i32, hitbox: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            hitbox,
        }
    }
}

/// Movement state for a dash-capable tank.
#[derive(Debug, Clone, PartialEq)]
pub struct TankMover {
    pub dash_direction: Vec2,
    pub last_dash_frame: Option<u32>,
}

impl Default for TankMover {
    fn default() -> Self {
        Self {
            dash_direction: Vec2::ZERO,
            last_dash_frame: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weapon {
    Cannon,
    Repeater,
}

impl Weapon {
    pub fn next(self) -> Self {
        match self {
            Weapon::Cannon => Weapon::Repeater,
            Weapon::Repeater => Weapon::Cannon,
        }
    }

    pub fn damage(self) -> i32 {
        match self {
            Weapon::Cannon => 34,
            Weapon::Repeater => 12,
        }
    }

    /// Frames between shots while the trigger is held.
    pub fn cooldown_frames(self) -> u32 {
        match self {
            Weapon::Cannon => 24,
            Weapon::Repeater => 6,
        }
    }
}

/// Player-controlled turret state.
#[derive(Debug, Clone, PartialEq)]
pub struct Tank {
    pub player_number: u8,
    pub weapon: Weapon,
    pub next_fire_frame: u32,
}

impl Tank {
    pub fn new(player_number: u8) -> Self {
        Self {
            player_number,
            weapon: Weapon::Cannon,
            next_fire_frame: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub velocity: Vec2,
    pub owner: EntityId,
    pub damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Repair,
    WeaponSwap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    pub kind: PickupKind,
}
