//! Input state tracking and normalization into per-tick movement flags.
//!
//! - **Level-triggered (held):** `is_held(key)` returns true every frame the key
//!   is physically down. Movement, jump and sprint are all sampled this way.
//!
//! - **Edge-triggered (just_pressed / just_released):** These are true only during
//!   the frame the transition happened. They are cleared by `end_frame()`, which
//!   the host loop calls only after at least one fixed simulation step has consumed
//!   them, so a press on a frame with zero steps is not lost.
//!
//! The simulation never sees keys. It consumes an `InputFlags` value sampled once
//! at the start of each tick, built either from the keyboard (`InputState::flags`)
//! or from a touch drag (`VirtualJoystick`).

use std::collections::HashSet;

use glam::Vec2;
use serde::Deserialize;

/// Drag distance in pixels before a joystick axis counts as pressed.
pub const JOYSTICK_DEAD_ZONE_PX: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
    Space,
    Shift,
}

/// Boolean movement intent for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputFlags {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub sprint: bool,
}

impl InputFlags {
    /// Horizontal intent as (x, y): forward is +x, left is +y.
    pub fn move_axes(&self) -> (f32, f32) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.forward {
            dx += 1.0;
        }
        if self.back {
            dx -= 1.0;
        }
        if self.left {
            dy += 1.0;
        }
        if self.right {
            dy -= 1.0;
        }
        (dx, dy)
    }

    pub fn any_direction(&self) -> bool {
        self.forward || self.back || self.left || self.right
    }

    /// Flags pressed by either source. Keyboard and joystick can be held together.
    pub fn union(self, other: InputFlags) -> InputFlags {
        InputFlags {
            forward: self.forward || other.forward,
            back: self.back || other.back,
            left: self.left || other.left,
            right: self.right || other.right,
            jump: self.jump || other.jump,
            sprint: self.sprint || other.sprint,
        }
    }
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    /// Drop every held key, e.g. when the window loses focus or a console opens.
    pub fn release_all(&mut self) {
        for key in self.held.drain() {
            self.just_released.insert(key);
        }
    }

    /// Sample the movement flags for the next tick. WASD and arrows are equivalent.
    pub fn flags(&self) -> InputFlags {
        InputFlags {
            forward: self.is_held(Key::W) || self.is_held(Key::Up),
            back: self.is_held(Key::S) || self.is_held(Key::Down),
            left: self.is_held(Key::A) || self.is_held(Key::Left),
            right: self.is_held(Key::D) || self.is_held(Key::Right),
            jump: self.is_held(Key::Space),
            sprint: self.is_held(Key::Shift),
        }
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// On-screen joystick driven by a single touch. Screen y grows downward, so
/// dragging up presses forward.
#[derive(Debug, Clone, Default)]
pub struct VirtualJoystick {
    origin: Option<Vec2>,
    current: Vec2,
    flags: InputFlags,
}

impl VirtualJoystick {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch_start(&mut self, at: Vec2) {
        self.origin = Some(at);
        self.current = at;
        self.flags = InputFlags::default();
    }

    pub fn touch_move(&mut self, at: Vec2) {
        let Some(origin) = self.origin else {
            return;
        };
        self.current = at;
        let delta = at - origin;
        self.flags.forward = delta.y < -JOYSTICK_DEAD_ZONE_PX;
        self.flags.back = delta.y > JOYSTICK_DEAD_ZONE_PX;
        self.flags.left = delta.x < -JOYSTICK_DEAD_ZONE_PX;
        self.flags.right = delta.x > JOYSTICK_DEAD_ZONE_PX;
    }

    pub fn touch_end(&mut self) {
        self.origin = None;
        self.flags = InputFlags::default();
    }

    pub fn is_active(&self) -> bool {
        self.origin.is_some()
    }

    /// Knob offset from the touch origin, for drawing the stick.
    pub fn offset(&self) -> Vec2 {
        self.origin.map_or(Vec2::ZERO, |origin| self.current - origin)
    }

    pub fn flags(&self) -> InputFlags {
        self.flags
    }
}
