//! Fixed isometric camera.
//!
//! World units map to pixels at `scale`. The view is a rotation of 55° about
//! X after -25° about Z, centred on a smoothed follow point, with a simple
//! perspective divide. Screen space is y-down with the origin at the viewport
//! centre; `depth` grows toward the viewer.

use glam::{Mat4, Vec3};

use crate::player::PlayerState;
use crate::world::World;

pub const PIXELS_PER_UNIT: f32 = 30.0;
pub const CAMERA_SMOOTHING: f32 = 0.1;
pub const PERSPECTIVE_PX: f32 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
}

/// A projected scene element, for painter's-order drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite<'a> {
    pub id: &'a str,
    pub point: ScreenPoint,
    /// Edge length in pixels before perspective.
    pub size_px: f32,
}

pub struct IsoCamera {
    pub focus: Vec3,
    pub scale: f32,
    pub smoothing: f32,
    pub perspective: f32,
    view: Mat4,
}

impl IsoCamera {
    pub fn new(focus: Vec3) -> Self {
        Self {
            focus,
            scale: PIXELS_PER_UNIT,
            smoothing: CAMERA_SMOOTHING,
            perspective: PERSPECTIVE_PX,
            view: Mat4::from_rotation_x(55f32.to_radians())
                * Mat4::from_rotation_z(-25f32.to_radians()),
        }
    }

    /// Ease the focus toward `target` by the smoothing factor. Called once
    /// per rendered frame.
    pub fn follow(&mut self, target: Vec3) {
        self.focus += (target - self.focus) * self.smoothing;
    }

    pub fn project(&self, world_point: Vec3) -> ScreenPoint {
        let rel = world_point - self.focus;
        // Screen y points down, so world y flips before rotating.
        let px = Vec3::new(rel.x, -rel.y, rel.z) * self.scale;
        let r = self.view.transform_point3(px);
        let w = self.perspective / (self.perspective - r.z).max(1.0);
        ScreenPoint {
            x: r.x * w,
            y: r.y * w,
            depth: r.z,
        }
    }

    /// Player and world objects, farthest first.
    pub fn project_scene<'a>(&self, world: &'a World, player: &PlayerState) -> Vec<Sprite<'a>> {
        let mut sprites: Vec<Sprite<'a>> = world
            .objects()
            .iter()
            .map(|object| Sprite {
                id: object.id.as_str(),
                point: self.project(object.position),
                size_px: object.size * self.scale,
            })
            .collect();
        sprites.push(Sprite {
            id: "player",
            point: self.project(player.position),
            size_px: self.scale,
        });
        sprites.sort_by(|a, b| a.point.depth.total_cmp(&b.point.depth));
        sprites
    }
}
