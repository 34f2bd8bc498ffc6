//! One play-through of a world: the live player, the world it moves in, and
//! the tuning that console commands can change between ticks.

use blox_core::input::InputFlags;
use glam::Vec3;

use crate::config::PlayConfig;
use crate::console::ConsoleCommand;
use crate::player::PlayerState;
use crate::step::{step, SimEvent};
use crate::world::{KindTag, ObjectKind, World, WorldError, WorldObject};

pub struct PlaySession {
    world: World,
    config: PlayConfig,
    state: PlayerState,
    won: bool,
    ticks: u64,
    deaths: u32,
}

impl PlaySession {
    pub fn new(world: World, config: PlayConfig) -> Self {
        let state = PlayerState::spawn(&world, &config.controller);
        log::info!(
            "Session started in '{}' at {:?}",
            world.world_id,
            state.position
        );
        Self {
            world,
            config,
            state,
            won: false,
            ticks: 0,
            deaths: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &PlayConfig {
        &self.config
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Set once a goal is reached. The session stops simulating afterwards.
    pub fn won(&self) -> bool {
        self.won
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    /// Advance one logical tick. Returns no events once the session is won.
    pub fn tick(&mut self, input: &InputFlags) -> Vec<SimEvent> {
        if self.won {
            return Vec::new();
        }

        let outcome = step(&self.state, input, &self.world, &self.config.controller);
        self.state = outcome.state;
        self.ticks += 1;

        for event in &outcome.events {
            match event {
                SimEvent::Jumped => log::debug!("tick {}: jumped", self.ticks),
                SimEvent::Landed => {
                    log::debug!("tick {}: landed at z={:.2}", self.ticks, self.state.position.z)
                }
                SimEvent::EnteredHazard { object_id } => {
                    log::info!("tick {}: entered hazard '{}'", self.ticks, object_id)
                }
                SimEvent::TouchedPickable { object_id } => {
                    log::debug!("tick {}: touched '{}'", self.ticks, object_id)
                }
                SimEvent::Died { cause } => {
                    self.deaths += 1;
                    log::info!("tick {}: died ({:?}), respawned", self.ticks, cause);
                }
                SimEvent::ReachedGoal { object_id } => {
                    self.won = true;
                    log::info!("tick {}: reached goal '{}'", self.ticks, object_id);
                }
            }
        }

        outcome.events
    }

    /// Append an object centred on the player's current position.
    /// Returns the generated id.
    pub fn spawn_object(
        &mut self,
        kind: KindTag,
        color: &str,
        size: f32,
    ) -> Result<String, WorldError> {
        let id = format!("m-{}", uuid::Uuid::new_v4());
        let object = WorldObject::new(
            id.clone(),
            ObjectKind::from_tag(kind, None),
            self.state.position,
            size,
        )
        .with_color(color);
        self.world = self.world.with_object(object)?;
        log::info!("Spawned {:?} '{}' at {:?}", kind, id, self.state.position);
        Ok(id)
    }

    /// Apply one console command. Only call between ticks.
    pub fn apply_command(&mut self, command: &ConsoleCommand) -> Result<(), WorldError> {
        let controller = &mut self.config.controller;
        match command {
            ConsoleCommand::ToggleFly => {
                controller.modifiers.fly = !controller.modifiers.fly;
                log::info!("Fly: {}", controller.modifiers.fly);
            }
            ConsoleCommand::ToggleNoclip => {
                controller.modifiers.noclip = !controller.modifiers.noclip;
                log::info!("Noclip: {}", controller.modifiers.noclip);
            }
            ConsoleCommand::ToggleInfiniteJump => {
                controller.modifiers.infinite_jump = !controller.modifiers.infinite_jump;
                log::info!("Infinite jump: {}", controller.modifiers.infinite_jump);
            }
            ConsoleCommand::SetInfiniteJump(enabled) => {
                controller.modifiers.infinite_jump = *enabled;
                log::info!("Infinite jump: {}", enabled);
            }
            ConsoleCommand::SetSpeed(accel) => {
                controller.move_accel = *accel;
                log::info!("Move accel set to {}", accel);
            }
            ConsoleCommand::SetJumpPower(impulse) => {
                controller.jump_impulse = *impulse;
                log::info!("Jump impulse set to {}", impulse);
            }
            ConsoleCommand::Spawn { kind, color, size } => {
                self.spawn_object(*kind, color, *size)?;
            }
            ConsoleCommand::Respawn => {
                self.state.respawn(&self.world, &self.config.controller);
                log::info!("Respawned at {:?}", self.state.position);
            }
        }
        Ok(())
    }

    /// Back to a fresh spawn with the win flag cleared. Spawned objects and
    /// modifiers are kept.
    pub fn restart(&mut self) {
        self.state = PlayerState::spawn(&self.world, &self.config.controller);
        self.won = false;
        self.ticks = 0;
        self.deaths = 0;
        log::info!("Session restarted");
    }

    pub fn player_position(&self) -> Vec3 {
        self.state.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::SPAWN_ID;

    fn obby() -> World {
        World::from_objects(
            "obby",
            vec![
                WorldObject::new(SPAWN_ID, ObjectKind::Solid, Vec3::ZERO, 4.0),
                WorldObject::new("bridge", ObjectKind::Solid, Vec3::new(5.0, 0.0, -1.0), 6.0),
                WorldObject::new("goal", ObjectKind::Goal, Vec3::new(10.0, 0.0, 0.0), 4.0),
            ],
        )
        .expect("valid world")
    }

    fn forward() -> InputFlags {
        InputFlags {
            forward: true,
            ..Default::default()
        }
    }

    #[test]
    fn session_freezes_after_goal() {
        let mut session = PlaySession::new(obby(), PlayConfig::default());
        let mut won_at = None;
        for _ in 0..120 {
            let events = session.tick(&forward());
            if events
                .iter()
                .any(|e| matches!(e, SimEvent::ReachedGoal { .. }))
            {
                won_at = Some(session.ticks());
                break;
            }
        }
        assert!(won_at.is_some());
        assert!(session.won());

        let frozen = *session.state();
        assert!(session.tick(&forward()).is_empty());
        assert_eq!(*session.state(), frozen);
        assert_eq!(Some(session.ticks()), won_at);
    }

    #[test]
    fn restart_clears_win_and_respawns() {
        let mut session = PlaySession::new(obby(), PlayConfig::default());
        for _ in 0..120 {
            session.tick(&forward());
        }
        assert!(session.won());

        session.restart();
        assert!(!session.won());
        assert_eq!(session.ticks(), 0);
        assert_eq!(session.player_position(), Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn spawned_objects_get_unique_prefixed_ids() {
        let mut session = PlaySession::new(obby(), PlayConfig::default());
        let a = session
            .spawn_object(KindTag::Solid, "#FF0000", 2.0)
            .expect("spawn");
        let b = session
            .spawn_object(KindTag::Hazard, "#FF4400", 2.0)
            .expect("spawn");

        assert!(a.starts_with("m-"));
        assert_ne!(a, b);
        assert_eq!(session.world().objects().len(), 5);
        let spawned = session.world().get(&b).expect("spawned object present");
        assert_eq!(spawned.position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(spawned.color, "#FF4400");
        assert_eq!(
            spawned.kind,
            ObjectKind::Hazard {
                damage_per_tick: None
            }
        );
    }

    #[test]
    fn invalid_spawn_size_is_rejected_and_world_unchanged() {
        let mut session = PlaySession::new(obby(), PlayConfig::default());
        let err = session
            .spawn_object(KindTag::Solid, "#FFFFFF", 0.0)
            .expect_err("zero size");
        assert!(matches!(err, WorldError::InvalidSize { .. }));
        assert_eq!(session.world().objects().len(), 3);
    }

    #[test]
    fn commands_change_tuning_and_modifiers() {
        let mut session = PlaySession::new(obby(), PlayConfig::default());
        session
            .apply_command(&ConsoleCommand::ToggleFly)
            .expect("fly");
        session
            .apply_command(&ConsoleCommand::SetSpeed(0.35))
            .expect("speed");
        session
            .apply_command(&ConsoleCommand::SetInfiniteJump(true))
            .expect("inf jump");

        let controller = session.config().controller;
        assert!(controller.modifiers.fly);
        assert!(controller.modifiers.infinite_jump);
        assert_eq!(controller.move_accel, 0.35);

        session
            .apply_command(&ConsoleCommand::ToggleFly)
            .expect("fly");
        assert!(!session.config().controller.modifiers.fly);
    }

    #[test]
    fn respawn_command_returns_player_to_spawn() {
        let mut session = PlaySession::new(obby(), PlayConfig::default());
        for _ in 0..40 {
            session.tick(&forward());
        }
        assert!(session.player_position().x > 1.0);

        session
            .apply_command(&ConsoleCommand::Respawn)
            .expect("respawn");
        assert_eq!(session.player_position(), Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(session.state().velocity, Vec3::ZERO);
    }

    #[test]
    fn deaths_are_counted() {
        let world = World::from_objects(
            "pit",
            vec![WorldObject::new(SPAWN_ID, ObjectKind::Solid, Vec3::ZERO, 4.0)],
        )
        .expect("valid world");
        let mut session = PlaySession::new(world, PlayConfig::default());
        session
            .apply_command(&ConsoleCommand::ToggleNoclip)
            .expect("noclip");

        let mut died = 0;
        for _ in 0..200 {
            died += session
                .tick(&InputFlags::default())
                .iter()
                .filter(|e| matches!(e, SimEvent::Died { .. }))
                .count();
        }
        assert!(died >= 1);
        assert_eq!(session.deaths() as usize, died);
    }
}
