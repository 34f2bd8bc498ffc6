use glam::Vec3;

use crate::config::{ControllerConfig, MAX_HEALTH};
use crate::world::World;

/// Kinematic state of the player. One live copy exists per session; the
/// simulation step takes it by reference and returns the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub position: Vec3,
    /// World units per tick.
    pub velocity: Vec3,
    pub grounded: bool,
    pub health: u32,
    /// Heading in degrees, `atan2(dx, dy)` of the last horizontal input.
    pub facing: f32,
    /// Horizontal input was held this tick. Drives the walk cycle.
    pub walking: bool,
    /// Standing on a damaging hazard this tick.
    pub in_hazard: bool,
}

impl PlayerState {
    pub fn at(position: Vec3, health: u32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            grounded: false,
            health,
            facing: 0.0,
            walking: false,
            in_hazard: false,
        }
    }

    /// Fresh state above the world's spawn. The player starts airborne and
    /// settles onto the spawn surface within the first few ticks.
    pub fn spawn(world: &World, config: &ControllerConfig) -> Self {
        Self::at(
            world.spawn_position(config.respawn_height),
            config.max_health.min(MAX_HEALTH),
        )
    }

    /// Reset to spawn, keeping the facing so the camera does not snap around.
    pub fn respawn(&mut self, world: &World, config: &ControllerConfig) {
        let facing = self.facing;
        *self = Self::spawn(world, config);
        self.facing = facing;
    }

    pub fn horizontal_speed(&self) -> f32 {
        self.velocity.truncate().length()
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.facing.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ObjectKind, WorldObject, SPAWN_ID};

    fn world() -> World {
        World::from_objects(
            "w",
            vec![WorldObject::new(
                SPAWN_ID,
                ObjectKind::Solid,
                Vec3::new(3.0, -2.0, 1.0),
                4.0,
            )],
        )
        .expect("valid world")
    }

    #[test]
    fn spawn_places_player_above_spawn_object() {
        let config = ControllerConfig::default();
        let state = PlayerState::spawn(&world(), &config);
        assert_eq!(state.position, Vec3::new(3.0, -2.0, 6.0));
        assert_eq!(state.velocity, Vec3::ZERO);
        assert_eq!(state.health, 100);
        assert!(!state.grounded);
    }

    #[test]
    fn respawn_resets_kinematics_but_keeps_facing() {
        let config = ControllerConfig::default();
        let world = world();
        let mut state = PlayerState::spawn(&world, &config);
        state.position = Vec3::new(50.0, 50.0, -30.0);
        state.velocity = Vec3::new(0.2, 0.1, -1.0);
        state.health = 0;
        state.facing = 90.0;
        state.in_hazard = true;

        state.respawn(&world, &config);
        assert_eq!(state.position, Vec3::new(3.0, -2.0, 6.0));
        assert_eq!(state.velocity, Vec3::ZERO);
        assert_eq!(state.health, 100);
        assert_eq!(state.facing, 90.0);
        assert!(!state.in_hazard);
    }

    #[test]
    fn spawn_health_never_exceeds_one_hundred() {
        let config = ControllerConfig {
            max_health: 250,
            ..Default::default()
        };
        let state = PlayerState::spawn(&world(), &config);
        assert_eq!(state.health, 100);
    }

    #[test]
    fn horizontal_speed_ignores_vertical_component() {
        let mut state = PlayerState::at(Vec3::ZERO, 100);
        state.velocity = Vec3::new(3.0, 4.0, -9.0);
        assert!((state.horizontal_speed() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn nan_is_not_finite() {
        let mut state = PlayerState::at(Vec3::ZERO, 100);
        assert!(state.is_finite());
        state.position.z = f32::NAN;
        assert!(!state.is_finite());
    }
}
