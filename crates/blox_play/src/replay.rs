use std::fs;
use std::path::{Path, PathBuf};

use blox_core::input::InputFlags;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read replay {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse replay JSON {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("replay validation failed: frames list is empty")]
    Empty,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default)]
    pub name: Option<String>,
    pub frames: Vec<ReplayFrame>,
}

/// Input held for `repeat` ticks. A `script` runs through the console before
/// the first of those ticks.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(flatten)]
    pub input: InputFlags,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    #[serde(default)]
    pub script: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayTick {
    pub input: InputFlags,
    pub script: Option<String>,
}

impl ReplaySequence {
    /// One entry per logical tick.
    pub fn expanded(&self) -> Vec<ReplayTick> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for i in 0..frame.repeat.max(1) {
                out.push(ReplayTick {
                    input: frame.input,
                    script: if i == 0 { frame.script.clone() } else { None },
                });
            }
        }
        out
    }

    pub fn tick_count(&self) -> usize {
        self.frames.iter().map(|f| f.repeat.max(1) as usize).sum()
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, ReplayError> {
    let raw = fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let replay: ReplaySequence = serde_json::from_str(&raw).map_err(|source| ReplayError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_replay(&replay)?;
    log::info!(
        "Loaded replay {} ({} frames, {} ticks)",
        path.display(),
        replay.frames.len(),
        replay.tick_count()
    );
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), ReplayError> {
    if replay.frames.is_empty() {
        return Err(ReplayError::Empty);
    }
    Ok(())
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayConfig;
    use crate::console::ScriptConsole;
    use crate::session::PlaySession;
    use crate::world::{ObjectKind, World, WorldObject, SPAWN_ID};
    use glam::Vec3;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "blox_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn sample_world() -> World {
        World::from_objects(
            "replay",
            vec![
                WorldObject::new(SPAWN_ID, ObjectKind::Solid, Vec3::ZERO, 4.0),
                WorldObject::new("p1", ObjectKind::Solid, Vec3::new(6.0, 0.0, 0.5), 4.0),
                WorldObject::new(
                    "lava",
                    ObjectKind::Hazard {
                        damage_per_tick: None,
                    },
                    Vec3::new(0.0, 6.0, -1.0),
                    4.0,
                ),
            ],
        )
        .expect("valid world")
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "forward": true, "repeat": 3, "script": "fly()" },
                { "jump": true }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded();
        assert_eq!(expanded.len(), 4);
        assert_eq!(replay.tick_count(), 4);
        assert!(expanded[0].input.forward);
        assert_eq!(expanded[0].script.as_deref(), Some("fly()"));
        assert!(expanded[1].script.is_none());
        assert!(expanded[3].input.jump);
        assert!(!expanded[3].input.forward);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_replay_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay");
        assert!(matches!(err, ReplayError::Empty));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn zero_repeat_counts_as_one_tick() {
        let replay: ReplaySequence =
            serde_json::from_str(r#"{ "frames": [ { "left": true, "repeat": 0 } ] }"#)
                .expect("parse");
        assert_eq!(replay.expanded().len(), 1);
    }

    fn run(replay: &ReplaySequence) -> PlaySession {
        let mut session = PlaySession::new(sample_world(), PlayConfig::default());
        let mut console = ScriptConsole::new().expect("console");
        for tick in replay.expanded() {
            if let Some(script) = &tick.script {
                for command in console.execute(script).expect("script runs") {
                    session.apply_command(&command).expect("command applies");
                }
            }
            session.tick(&tick.input);
        }
        session
    }

    #[test]
    fn bundled_obby_run_reaches_goal() {
        let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets");
        let world = crate::world::load_world_from_path(&assets.join("worlds/obby.json"))
            .expect("bundled world loads");
        let replay =
            load_replay_from_path(&assets.join("replays/obby_run.json")).expect("replay loads");

        let mut session = PlaySession::new(world, PlayConfig::default());
        for tick in replay.expanded() {
            session.tick(&tick.input);
        }
        assert!(session.won(), "ended at {:?}", session.state().position);
        assert_eq!(session.deaths(), 0);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let replay: ReplaySequence = serde_json::from_str(
            r#"{
              "frames": [
                { "forward": true, "repeat": 40 },
                { "forward": true, "jump": true },
                { "forward": true, "repeat": 60 },
                { "left": true, "sprint": true, "repeat": 45, "script": "speed(0.08)" },
                { "back": true, "right": true, "repeat": 90 }
              ]
            }"#,
        )
        .expect("parse replay");

        let a = run(&replay);
        let b = run(&replay);
        assert_eq!(a.state(), b.state());
        assert_eq!(a.ticks(), b.ticks());
        assert_eq!(a.deaths(), b.deaths());
        assert_eq!(a.config().controller.move_accel, 0.08);
    }
}
