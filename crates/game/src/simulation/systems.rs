use glam::Vec2;

use crate::state::{ComponentError, EntityId};
use crate::world::{
    ARENA_HALF_EXTENT, BULLET_BOUND, BULLET_SPEED, DASH_COOLDOWN_FRAMES, DASH_SPEED, PICKUP_HEAL,
    PICKUP_RADIUS, TANK_HITBOX, TANK_SPEED, EntityConfig, dash_active,
    components::PickupKind, tank_of_player,
};

use super::effects::Effect;
use super::frame::{DebugShape, FrameState};

/// Extra reach on spatial queries to cover one tick of target movement, since
/// the index holds end-of-previous-tick positions.
const QUERY_SLACK: f32 = 1.0;
const BULLET_RADIUS: f32 = 0.2;
const MUZZLE_OFFSET: f32 = 0.3;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("system `{system}` failed: {source}")]
    System {
        system: &'static str,
        source: ComponentError,
    },
}

type SystemFn = fn(&mut FrameState<'_>, f32) -> Result<(), ComponentError>;

/// The per-tick pipeline. Order is load-bearing: `transform_init` must
/// snapshot `previous_position` before any mover writes, and
/// `damage_resolution` must run after everything that deals damage this tick.
/// The same list runs on the server's authoritative path and every client
/// path; sharing it is what makes prediction reproducible.
const PIPELINE: &[(&str, SystemFn)] = &[
    ("transform_init", transform_init),
    ("tank_movement", tank_movement),
    ("arena_clamp", arena_clamp),
    ("weapon_fire", weapon_fire),
    ("bullet_flight", bullet_flight),
    ("damage_resolution", damage_resolution),
    ("pickup_collection", pickup_collection),
];

/// Advances the world by one tick. Finishes with the db's post-frame update
/// (deferred deletions, index maintenance). A [`ComponentError`] escaping a
/// system is a logic error and fails the whole tick.
pub fn simulate(state: &mut FrameState<'_>, dt: f32) -> Result<(), SimulationError> {
    for &(name, system) in PIPELINE {
        system(state, dt).map_err(|source| SimulationError::System {
            system: name,
            source,
        })?;
    }
    state.db.post_frame_update();
    Ok(())
}

fn transform_init(state: &mut FrameState<'_>, _dt: f32) -> Result<(), ComponentError> {
    for id in state.db.components.transforms.ids() {
        state
            .db
            .components
            .transforms
            .update(id, |t| t.previous_position = t.position)?;
    }
    Ok(())
}

fn tank_movement(state: &mut FrameState<'_>, dt: f32) -> Result<(), ComponentError> {
    let frame = state.frame;

    for input in state.inputs {
        let Some(movement) = input.movement else {
            continue;
        };
        let Some(id) = tank_of_player(&state.db.components, input.player_number) else {
            continue;
        };
        let direction = movement.direction.vector();
        if direction != Vec2::ZERO {
            state.db.components.transforms.update(id, |t| {
                t.position += direction * TANK_SPEED * dt;
                t.orientation = direction.y.atan2(direction.x);
            })?;
        }
        if movement.dash && direction != Vec2::ZERO {
            let ready = state.db.components.movers.get(id).is_some_and(|mover| {
                mover
                    .last_dash_frame
                    .is_none_or(|start| frame.wrapping_sub(start) >= DASH_COOLDOWN_FRAMES)
            });
            if ready {
                state.db.components.movers.update(id, |mover| {
                    mover.dash_direction = direction;
                    mover.last_dash_frame = Some(frame);
                })?;
                state.db.components.invulnerable.insert(id);
            }
        }
    }

    // Active dashes keep carrying their tank; expired ones drop the i-frames.
    for id in state.db.components.movers.ids() {
        let Some(mover) = state.db.components.movers.get(id) else {
            continue;
        };
        if dash_active(mover, frame) {
            let push = mover.dash_direction * DASH_SPEED * dt;
            state
                .db
                .components
                .transforms
                .update(id, |t| t.position += push)?;
        } else {
            state.db.components.invulnerable.remove(id);
        }
    }
    Ok(())
}

fn arena_clamp(state: &mut FrameState<'_>, _dt: f32) -> Result<(), ComponentError> {
    let bound = Vec2::splat(ARENA_HALF_EXTENT);
    for id in state.db.components.tanks.ids() {
        state
            .db
            .components
            .transforms
            .update(id, |t| t.position = t.position.clamp(-bound, bound))?;
    }
    Ok(())
}

fn weapon_fire(state: &mut FrameState<'_>, _dt: f32) -> Result<(), ComponentError> {
    let frame = state.frame;
    for input in state.inputs {
        let Some(id) = tank_of_player(&state.db.components, input.player_number) else {
            continue;
        };
        if input.change_weapon {
            state
                .db
                .components
                .tanks
                .update(id, |tank| tank.weapon = tank.weapon.next())?;
        }
        let Some(attack) = input.attack else {
            continue;
        };
        let Some((weapon, next_fire_frame)) = state
            .db
            .components
            .tanks
            .get(id)
            .map(|tank| (tank.weapon, tank.next_fire_frame))
        else {
            continue;
        };
        if !(attack.fire_down || attack.fire_held) || frame < next_fire_frame {
            continue;
        }
        let Some(origin) = state.db.components.transforms.get(id).map(|t| t.position) else {
            continue;
        };
        let target = Vec2::from(attack.target_pos);
        let Some(direction) = (target - origin).try_normalize() else {
            continue;
        };

        state
            .db
            .components
            .tanks
            .update(id, |tank| tank.next_fire_frame = frame + weapon.cooldown_frames())?;
        let muzzle = origin + direction * (TANK_HITBOX + MUZZLE_OFFSET);
        state.db.register_entity(EntityConfig::bullet(
            muzzle,
            direction * BULLET_SPEED,
            id,
            weapon.damage(),
        ));
        state.effects.emit(frame, Effect::ShotFired { shooter: id });
        state.debug.push(
            state.phase,
            DebugShape::Line {
                from: origin,
                to: target,
            },
        );
    }
    Ok(())
}

fn bullet_flight(state: &mut FrameState<'_>, dt: f32) -> Result<(), ComponentError> {
    let bullets: Vec<(EntityId, Vec2)> = state
        .db
        .components
        .bullets
        .iter()
        .map(|(id, bullet)| (id, bullet.velocity))
        .collect();
    for (id, velocity) in bullets {
        state
            .db
            .components
            .transforms
            .update(id, |t| t.position += velocity * dt)?;
        let Some(position) = state.db.components.transforms.get(id).map(|t| t.position) else {
            continue;
        };
        if position.x.abs() > BULLET_BOUND || position.y.abs() > BULLET_BOUND {
            state.db.mark_for_deletion(id);
        }
    }
    Ok(())
}

fn damage_resolution(state: &mut FrameState<'_>, _dt: f32) -> Result<(), ComponentError> {
    let frame = state.frame;
    let bullets: Vec<(EntityId, EntityId, i32, Vec2)> = state
        .db
        .components
        .bullets
        .iter()
        .filter_map(|(id, bullet)| {
            let transform = state.db.components.transforms.get(id)?;
            Some((id, bullet.owner, bullet.damage, transform.position))
        })
        .collect();

    for (bullet_id, owner, damage, position) in bullets {
        if state.db.is_pending_deletion(bullet_id) {
            continue;
        }
        let candidates = state.db.indexes.query_circle(
            &state.db.components,
            position,
            TANK_HITBOX + BULLET_RADIUS + QUERY_SLACK,
        );
        for target in candidates {
            if target == owner || state.db.is_pending_deletion(target) {
                continue;
            }
            let Some(hitbox) = state.db.components.damageables.get(target).map(|d| d.hitbox)
            else {
                continue;
            };
            if state.db.components.invulnerable.contains(target) {
                continue;
            }
            let Some(target_pos) = state.db.components.transforms.get(target).map(|t| t.position)
            else {
                continue;
            };
            if position.distance_squared(target_pos) > (hitbox + BULLET_RADIUS).powi(2) {
                continue;
            }

            state
                .db
                .components
                .damageables
                .update(target, |d| d.health -= damage)?;
            state.db.mark_for_deletion(bullet_id);
            state.debug.push(
                state.phase,
                DebugShape::Circle {
                    center: target_pos,
                    radius: hitbox,
                },
            );

            let dead = state
                .db
                .components
                .damageables
                .get(target)
                .is_some_and(|d| d.health <= 0);
            if dead {
                state.db.mark_for_deletion(target);
                state
                    .db
                    .register_entity(EntityConfig::pickup(target_pos, PickupKind::WeaponSwap));
                state.effects.emit(frame, Effect::TankDestroyed { tank: target });
            }
            // A bullet spends itself on its first hit.
            break;
        }
    }
    Ok(())
}

fn pickup_collection(state: &mut FrameState<'_>, _dt: f32) -> Result<(), ComponentError> {
    let frame = state.frame;
    let pickups: Vec<(EntityId, PickupKind, Vec2)> = state
        .db
        .components
        .pickups
        .iter()
        .filter_map(|(id, pickup)| {
            let transform = state.db.components.transforms.get(id)?;
            Some((id, pickup.kind, transform.position))
        })
        .collect();

    for (pickup_id, kind, position) in pickups {
        if state.db.is_pending_deletion(pickup_id) {
            continue;
        }
        let candidates = state.db.indexes.query_circle(
            &state.db.components,
            position,
            PICKUP_RADIUS + TANK_HITBOX + QUERY_SLACK,
        );
        let taker = candidates.into_iter().find(|&id| {
            state.db.components.tanks.has(id)
                && !state.db.is_pending_deletion(id)
                && state
                    .db
                    .components
                    .transforms
                    .get(id)
                    .is_some_and(|t| t.position.distance(position) <= PICKUP_RADIUS + TANK_HITBOX)
        });
        let Some(tank_id) = taker else {
            continue;
        };
        match kind {
            PickupKind::Repair => {
                state.db.components.damageables.update(tank_id, |d| {
                    d.health = (d.health + PICKUP_HEAL).min(d.max_health);
                })?;
            }
            PickupKind::WeaponSwap => {
                state
                    .db
                    .components
                    .tanks
                    .update(tank_id, |tank| tank.weapon = tank.weapon.next())?;
            }
        }
        state.db.mark_for_deletion(pickup_id);
        state.effects.emit(frame, Effect::PickupTaken { tank: tank_id });
    }
    Ok(())
}
