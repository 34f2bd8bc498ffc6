//! World model: the static set of axis-aligned cubes a session plays on.
//!
//! Worlds are authored as JSON (`WorldFile`) and converted into a validated
//! `World` at load time. Everything the per-tick math relies on (finite
//! positions, positive sizes, a Solid spawn) is checked here once, so the
//! simulation step never has to guard against malformed geometry.
//!
//! Object kinds are a closed enum. The loader also accepts the legacy tags
//! older worlds were written with (`box`, `sphere`, `lava`, `npc`).

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;

pub const SPAWN_ID: &str = "spawn";

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("failed to read world file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse world JSON {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("world validation failed: objects array is empty")]
    Empty,
    #[error("world validation failed: object with empty id")]
    EmptyId,
    #[error("world validation failed: duplicate object id '{0}'")]
    DuplicateId(String),
    #[error("world validation failed: object '{0}' has a non-finite position")]
    NonFinitePosition(String),
    #[error("world validation failed: object '{id}' has invalid size {size} (must be finite and > 0)")]
    InvalidSize { id: String, size: f32 },
    #[error("world validation failed: no object with id 'spawn'")]
    MissingSpawn,
    #[error("world validation failed: spawn object must be solid, found {0:?}")]
    SpawnNotSolid(KindTag),
    #[error("world validation failed: kill_z must be finite")]
    NonFiniteKillZ,
}

/// Kind tag as written in world files.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KindTag {
    /// Legacy `npc` objects were stood on like any other cube.
    #[serde(alias = "box", alias = "sphere", alias = "npc")]
    Solid,
    #[serde(alias = "lava")]
    Hazard,
    Goal,
    Pickable,
    Decoration,
}

impl KindTag {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "solid" | "box" | "sphere" | "npc" => Some(Self::Solid),
            "hazard" | "lava" => Some(Self::Hazard),
            "goal" => Some(Self::Goal),
            "pickable" => Some(Self::Pickable),
            "decoration" => Some(Self::Decoration),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorldFile {
    pub version: String,
    pub world_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub kill_z: Option<f32>,
    pub objects: Vec<ObjectRecord>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObjectRecord {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: KindTag,
    pub position: PointRecord,
    pub size: f32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub safe_zone: bool,
    #[serde(default)]
    pub damage: Option<u32>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct PointRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Collision semantics of an object, with the data each kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Solid,
    /// Damages while stood on. `None` uses the configured default.
    Hazard { damage_per_tick: Option<u32> },
    Goal,
    /// Reported on contact, removed by inventory logic outside the simulation.
    Pickable,
    Decoration,
}

impl ObjectKind {
    pub fn from_tag(tag: KindTag, damage: Option<u32>) -> Self {
        match tag {
            KindTag::Solid => Self::Solid,
            KindTag::Hazard => Self::Hazard {
                damage_per_tick: damage,
            },
            KindTag::Goal => Self::Goal,
            KindTag::Pickable => Self::Pickable,
            KindTag::Decoration => Self::Decoration,
        }
    }

    pub fn tag(self) -> KindTag {
        match self {
            Self::Solid => KindTag::Solid,
            Self::Hazard { .. } => KindTag::Hazard,
            Self::Goal => KindTag::Goal,
            Self::Pickable => KindTag::Pickable,
            Self::Decoration => KindTag::Decoration,
        }
    }

    /// Kinds the player can stand on and that block sideways movement.
    pub fn is_landable(self) -> bool {
        matches!(self, Self::Solid | Self::Hazard { .. } | Self::Goal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    pub id: String,
    pub kind: ObjectKind,
    pub position: Vec3,
    pub size: f32,
    pub color: String,
    pub safe_zone: bool,
    pub label: Option<String>,
    pub material: Option<String>,
}

impl WorldObject {
    pub fn new(id: impl Into<String>, kind: ObjectKind, position: Vec3, size: f32) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            size,
            color: default_color(),
            safe_zone: false,
            label: None,
            material: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn safe(mut self) -> Self {
        self.safe_zone = true;
        self
    }

    pub fn half_size(&self) -> f32 {
        self.size / 2.0
    }

    pub fn top(&self) -> f32 {
        self.position.z + self.half_size()
    }

    pub fn bottom(&self) -> f32 {
        self.position.z - self.half_size()
    }

    fn from_record(record: ObjectRecord) -> Self {
        Self {
            kind: ObjectKind::from_tag(record.kind, record.damage),
            position: Vec3::new(record.position.x, record.position.y, record.position.z),
            id: record.id,
            size: record.size,
            color: record.color,
            safe_zone: record.safe_zone,
            label: record.label,
            material: record.material,
        }
    }
}

#[derive(Debug, Clone)]
pub struct World {
    pub version: String,
    pub world_id: String,
    pub title: Option<String>,
    pub instructions: Option<String>,
    kill_z: Option<f32>,
    objects: Vec<WorldObject>,
    spawn_index: usize,
}

impl World {
    pub fn from_file(file: WorldFile) -> Result<Self, WorldError> {
        let objects = file
            .objects
            .into_iter()
            .map(WorldObject::from_record)
            .collect();
        Self::build(
            file.version,
            file.world_id,
            file.title,
            file.instructions,
            file.kill_z,
            objects,
        )
    }

    /// Build a world from objects constructed in code.
    pub fn from_objects(
        world_id: impl Into<String>,
        objects: Vec<WorldObject>,
    ) -> Result<Self, WorldError> {
        Self::build("0.1".to_string(), world_id.into(), None, None, None, objects)
    }

    fn build(
        version: String,
        world_id: String,
        title: Option<String>,
        instructions: Option<String>,
        kill_z: Option<f32>,
        objects: Vec<WorldObject>,
    ) -> Result<Self, WorldError> {
        let spawn_index = validate_objects(&objects)?;
        if kill_z.is_some_and(|z| !z.is_finite()) {
            return Err(WorldError::NonFiniteKillZ);
        }
        Ok(Self {
            version,
            world_id,
            title,
            instructions,
            kill_z,
            objects,
            spawn_index,
        })
    }

    /// Objects in authored order. The order is stable for the world's lifetime.
    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    pub fn get(&self, id: &str) -> Option<&WorldObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn spawn(&self) -> &WorldObject {
        &self.objects[self.spawn_index]
    }

    /// Where the player appears: above the spawn centre by `respawn_height`.
    pub fn spawn_position(&self, respawn_height: f32) -> Vec3 {
        self.spawn().position + Vec3::new(0.0, 0.0, respawn_height)
    }

    /// World-specific kill plane, if the author set one.
    pub fn kill_z(&self) -> Option<f32> {
        self.kill_z
    }

    pub fn with_kill_z(mut self, kill_z: f32) -> Result<Self, WorldError> {
        if !kill_z.is_finite() {
            return Err(WorldError::NonFiniteKillZ);
        }
        self.kill_z = Some(kill_z);
        Ok(self)
    }

    /// A copy of this world with `object` appended. Only valid between ticks.
    pub fn with_object(&self, object: WorldObject) -> Result<Self, WorldError> {
        let mut objects = self.objects.clone();
        objects.push(object);
        Self::build(
            self.version.clone(),
            self.world_id.clone(),
            self.title.clone(),
            self.instructions.clone(),
            self.kill_z,
            objects,
        )
    }
}

pub fn load_world_from_path(path: &Path) -> Result<World, WorldError> {
    let raw = fs::read_to_string(path).map_err(|source| WorldError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: WorldFile = serde_json::from_str(&raw).map_err(|source| WorldError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let world = World::from_file(file)?;
    log::info!(
        "World loaded: {} ({}), {} objects",
        world.world_id,
        world.version,
        world.objects().len()
    );
    Ok(world)
}

/// Returns the index of the spawn object.
fn validate_objects(objects: &[WorldObject]) -> Result<usize, WorldError> {
    if objects.is_empty() {
        return Err(WorldError::Empty);
    }

    let mut seen = HashSet::new();
    let mut spawn_index = None;
    for (index, object) in objects.iter().enumerate() {
        if object.id.is_empty() {
            return Err(WorldError::EmptyId);
        }
        if !seen.insert(object.id.as_str()) {
            return Err(WorldError::DuplicateId(object.id.clone()));
        }
        if !object.position.is_finite() {
            return Err(WorldError::NonFinitePosition(object.id.clone()));
        }
        if !object.size.is_finite() || object.size <= 0.0 {
            return Err(WorldError::InvalidSize {
                id: object.id.clone(),
                size: object.size,
            });
        }
        if object.id == SPAWN_ID {
            spawn_index = Some(index);
        }
    }

    let spawn_index = spawn_index.ok_or(WorldError::MissingSpawn)?;
    let spawn_kind = objects[spawn_index].kind;
    if spawn_kind != ObjectKind::Solid {
        return Err(WorldError::SpawnNotSolid(spawn_kind.tag()));
    }

    warn_on_overlapping_tops(objects);
    Ok(spawn_index)
}

/// Overlapping landing surfaces make the snap target depend on iteration
/// order. Allowed, but worth telling the author.
fn warn_on_overlapping_tops(objects: &[WorldObject]) {
    for (i, a) in objects.iter().enumerate() {
        if !a.kind.is_landable() {
            continue;
        }
        for b in objects.iter().skip(i + 1) {
            if !b.kind.is_landable() || (a.top() - b.top()).abs() < f32::EPSILON {
                continue;
            }
            let reach = a.half_size() + b.half_size();
            let overlaps_xy = (a.position.x - b.position.x).abs() < reach
                && (a.position.y - b.position.y).abs() < reach;
            if overlaps_xy && (a.top() - b.top()).abs() < 1.0 {
                log::debug!(
                    "Objects '{}' and '{}' have overlapping landing surfaces; last in order wins",
                    a.id,
                    b.id
                );
            }
        }
    }
}

fn default_color() -> String {
    "#888888".to_string()
}
