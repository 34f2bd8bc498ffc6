//! The simulation step: one fixed tick of player movement against the world.
//!
//! Order within a tick:
//!   1. horizontal input accumulates into vx/vy and sets facing
//!   2. jump impulse (grounded, or any time with infinite jump)
//!   3. gravity, clamped to terminal fall speed
//!   4. friction on vx/vy only
//!   5. horizontal speed clamp while a direction is held
//!   6. position += velocity
//!   7. collisions against every object, in world order
//!   8. death check (health, kill plane, non-finite state) and respawn
//!   9. Landed derived from the grounded transition
//!
//! Collision treats the player as a vertical segment `[z, z + player_height]`
//! whose feet are a point with a horizontal margin of `player_radius`. When two
//! landing surfaces overlap, the last one in world order decides the snap
//! height. Worlds should not rely on either.
//!
//! `step` never fails. A non-finite state is treated as a death and respawned.

use blox_core::input::InputFlags;

use crate::config::{ControllerConfig, MAX_HEALTH};
use crate::player::PlayerState;
use crate::world::{ObjectKind, World, WorldObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Health,
    Fell,
    InvalidState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Jumped,
    Landed,
    EnteredHazard { object_id: String },
    ReachedGoal { object_id: String },
    TouchedPickable { object_id: String },
    Died { cause: DeathCause },
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub state: PlayerState,
    pub events: Vec<SimEvent>,
}

#[derive(Debug, Default)]
struct Contacts {
    supported: bool,
    safe_zone: bool,
    hazard: Option<(String, u32)>,
    goal: Option<String>,
    pickables: Vec<String>,
}

pub fn step(
    state: &PlayerState,
    input: &InputFlags,
    world: &World,
    config: &ControllerConfig,
) -> StepOutcome {
    let modifiers = config.modifiers;
    let mut next = *state;
    let mut events = Vec::new();

    let (dx, dy) = input.move_axes();
    let accel = horizontal_accel(state.grounded, input, config);
    next.velocity.x += dx * accel;
    next.velocity.y += dy * accel;
    next.walking = dx != 0.0 || dy != 0.0;
    if next.walking {
        next.facing = dx.atan2(dy).to_degrees();
    }

    if modifiers.fly {
        next.velocity.z = 0.0;
        if input.jump {
            next.position.z += config.fly_speed;
        }
        if input.sprint {
            next.position.z -= config.fly_speed;
        }
    } else {
        if input.jump && (next.grounded || modifiers.infinite_jump) {
            next.velocity.z = config.jump_impulse;
            next.grounded = false;
            events.push(SimEvent::Jumped);
        }
        next.velocity.z = (next.velocity.z + config.gravity).max(-config.max_fall_speed);
    }

    next.velocity.x *= config.friction;
    next.velocity.y *= config.friction;

    if next.walking && !modifiers.fly {
        clamp_horizontal_speed(&mut next, input, config);
    }

    next.position += next.velocity;

    let contacts = if modifiers.noclip {
        Contacts::default()
    } else {
        resolve_collisions(&mut next, world, config)
    };
    next.grounded = contacts.supported && !modifiers.fly;

    match contacts.hazard.filter(|_| !contacts.safe_zone) {
        Some((object_id, damage)) => {
            if !state.in_hazard {
                events.push(SimEvent::EnteredHazard { object_id });
            }
            next.health = next.health.saturating_sub(damage);
            next.in_hazard = true;
        }
        None => next.in_hazard = false,
    }
    next.health = next.health.min(config.max_health.min(MAX_HEALTH));

    if let Some(object_id) = contacts.goal {
        events.push(SimEvent::ReachedGoal { object_id });
    }
    events.extend(
        contacts
            .pickables
            .into_iter()
            .map(|object_id| SimEvent::TouchedPickable { object_id }),
    );

    if let Some(cause) = death_cause(&next, world, config) {
        if cause == DeathCause::InvalidState {
            log::warn!(
                "Player state became non-finite (pos {:?}, vel {:?}); respawning",
                next.position,
                next.velocity
            );
        }
        next.respawn(world, config);
        events.push(SimEvent::Died { cause });
        return StepOutcome {
            state: next,
            events,
        };
    }

    if next.grounded && !state.grounded {
        events.push(SimEvent::Landed);
    }

    StepOutcome {
        state: next,
        events,
    }
}

fn horizontal_accel(grounded: bool, input: &InputFlags, config: &ControllerConfig) -> f32 {
    if config.modifiers.fly {
        return config.fly_speed;
    }
    let mut accel = config.move_accel;
    if !grounded {
        accel *= config.air_control;
    }
    if input.sprint {
        accel *= config.sprint_multiplier;
    }
    accel
}

fn clamp_horizontal_speed(state: &mut PlayerState, input: &InputFlags, config: &ControllerConfig) {
    let max_speed = if input.sprint {
        config.max_horizontal_speed * config.sprint_multiplier
    } else {
        config.max_horizontal_speed
    };
    let horizontal = state.velocity.truncate();
    let speed = horizontal.length();
    if speed > max_speed {
        let scaled = horizontal * (max_speed / speed);
        state.velocity.x = scaled.x;
        state.velocity.y = scaled.y;
    }
}

fn resolve_collisions(
    state: &mut PlayerState,
    world: &World,
    config: &ControllerConfig,
) -> Contacts {
    let mut contacts = Contacts::default();
    let fly = config.modifiers.fly;

    for object in world.objects() {
        let reach = object.half_size() + config.player_radius;
        let off_x = state.position.x - object.position.x;
        let off_y = state.position.y - object.position.y;
        if !(off_x.abs() < reach && off_y.abs() < reach) {
            continue;
        }

        match object.kind {
            ObjectKind::Decoration => continue,
            ObjectKind::Pickable => {
                if overlaps_vertically(state, object, config) {
                    contacts.pickables.push(object.id.clone());
                }
                continue;
            }
            ObjectKind::Solid | ObjectKind::Hazard { .. } | ObjectKind::Goal => {}
        }

        let top = object.top();
        let z = state.position.z;
        let in_landing_band = z >= top - config.land_below && z <= top + config.land_above;

        if in_landing_band && state.velocity.z <= 0.0 {
            if !fly {
                if contacts.supported && (state.position.z - top).abs() > f32::EPSILON {
                    log::trace!("Ambiguous landing: '{}' overrides earlier surface", object.id);
                }
                state.position.z = top;
                state.velocity.z = 0.0;
            }
            contacts.supported = true;
            contacts.safe_zone |= object.safe_zone;
            match object.kind {
                ObjectKind::Goal => {
                    contacts.goal.get_or_insert_with(|| object.id.clone());
                }
                ObjectKind::Hazard { damage_per_tick } => {
                    contacts.hazard.get_or_insert_with(|| {
                        (
                            object.id.clone(),
                            damage_per_tick.unwrap_or(config.hazard_damage),
                        )
                    });
                }
                _ => {}
            }
        } else if z < top - config.land_below && overlaps_vertically(state, object, config) {
            push_out_sideways(state, off_x, off_y, reach);
        }
    }

    contacts
}

fn overlaps_vertically(state: &PlayerState, object: &WorldObject, config: &ControllerConfig) -> bool {
    let z = state.position.z;
    z <= object.top() && z + config.player_height > object.bottom()
}

/// Separate along whichever horizontal axis needs the smaller correction and
/// stop motion on that axis.
fn push_out_sideways(state: &mut PlayerState, off_x: f32, off_y: f32, reach: f32) {
    let overlap_x = reach - off_x.abs();
    let overlap_y = reach - off_y.abs();
    if overlap_x <= overlap_y {
        state.position.x += overlap_x.copysign(off_x);
        state.velocity.x = 0.0;
    } else {
        state.position.y += overlap_y.copysign(off_y);
        state.velocity.y = 0.0;
    }
}

fn death_cause(state: &PlayerState, world: &World, config: &ControllerConfig) -> Option<DeathCause> {
    let kill_z = world.kill_z().unwrap_or(config.kill_z);
    if !state.is_finite() {
        Some(DeathCause::InvalidState)
    } else if state.health == 0 {
        Some(DeathCause::Health)
    } else if state.position.z < kill_z {
        Some(DeathCause::Fell)
    } else {
        None
    }
}
