//! Live host objects the recorders read from and write into.
//!
//! The timeline does not simulate anything itself. These types stand in for
//! the host simulation's components: gameplay code mutates them every tick,
//! recorders capture them, and playback writes recorded values back. They
//! are shared through [`Live`] handles so that gameplay code and recorders
//! can both hold on to the same object.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A shared, mutable handle to a live host object.
pub type Live<T> = Rc<RefCell<T>>;

/// Wrap `value` in a [`Live`] handle.
pub fn live<T>(value: T) -> Live<T> {
    Rc::new(RefCell::new(value))
}

// ---------------------------------------------------------------------------
// Math types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A rotation quaternion. Defaults to the identity rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation of `angle` radians around the z axis.
    pub fn from_rotation_z(angle: f32) -> Self {
        let half = angle * 0.5;
        Self {
            x: 0.0,
            y: 0.0,
            z: half.sin(),
            w: half.cos(),
        }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Which coordinates of a [`Transform`] a recorder works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Space {
    #[default]
    World,
    /// Relative to the parent, as used by animated bones.
    Local,
}

/// Position and rotation in world and parent-local space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub local_position: Vec3,
    pub local_rotation: Quat,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            local_position: position,
            ..Self::default()
        }
    }

    pub fn coordinates(&self, space: Space) -> (Vec3, Quat) {
        match space {
            Space::World => (self.position, self.rotation),
            Space::Local => (self.local_position, self.local_rotation),
        }
    }

    pub fn set_coordinates(&mut self, space: Space, position: Vec3, rotation: Quat) {
        match space {
            Space::World => {
                self.position = position;
                self.rotation = rotation;
            }
            Space::Local => {
                self.local_position = position;
                self.local_rotation = rotation;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Body3d
// ---------------------------------------------------------------------------

/// A 3D rigid body owned by the host physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Body3d {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Kinematic bodies are moved by code, not by the solver.
    pub is_kinematic: bool,
}

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

/// Playback position of one animator layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerState {
    /// Hash of the state currently playing.
    pub state_hash: i32,
    /// Normalized time within that state.
    pub normalized_time: f32,
}

/// The value of an animator parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f32),
    Int(i32),
    Bool(bool),
}

impl Default for ParameterValue {
    fn default() -> Self {
        Self::Float(0.0)
    }
}

/// The declared type of an animator parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    Float,
    Int,
    Bool,
}

impl ParameterKind {
    /// The zero value of this kind.
    pub fn zero(self) -> ParameterValue {
        match self {
            Self::Float => ParameterValue::Float(0.0),
            Self::Int => ParameterValue::Int(0),
            Self::Bool => ParameterValue::Bool(false),
        }
    }
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Float(_) => ParameterKind::Float,
            Self::Int(_) => ParameterKind::Int,
            Self::Bool(_) => ParameterKind::Bool,
        }
    }
}

/// A state-machine animator with parameters, layers and a bone rig.
#[derive(Debug)]
pub struct Animator {
    pub enabled: bool,
    pub speed: f32,
    pub layers: Vec<LayerState>,
    /// Parameters in declaration order.
    pub parameters: IndexMap<String, ParameterValue>,
    pub root_position: Vec3,
    pub root_rotation: Quat,
    pub bones: Vec<Live<Transform>>,
}

impl Default for Animator {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 1.0,
            layers: vec![LayerState::default()],
            parameters: IndexMap::new(),
            root_position: Vec3::ZERO,
            root_rotation: Quat::IDENTITY,
            bones: Vec::new(),
        }
    }
}

impl Animator {
    /// Jump `layer` to `state_hash` at `normalized_time`.
    pub fn play(&mut self, state_hash: i32, layer: usize, normalized_time: f32) {
        if let Some(state) = self.layers.get_mut(layer) {
            state.state_hash = state_hash;
            state.normalized_time = normalized_time;
        }
    }

    /// Set a parameter. Values of the wrong kind are ignored.
    pub fn set_parameter(&mut self, name: &str, value: ParameterValue) -> bool {
        match self.parameters.get_mut(name) {
            Some(slot) if slot.kind() == value.kind() => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Advance every layer by `dt` seconds scaled by speed.
    pub fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }
        for layer in &mut self.layers {
            layer.normalized_time += dt * self.speed;
        }
    }
}

// ---------------------------------------------------------------------------
// ParticleSystem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticlePlayState {
    #[default]
    Playing,
    Paused,
    Stopped,
}

/// A particle emitter. Only its clock and play state are observable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParticleSystem {
    /// Seconds since the emitter started.
    pub time: f32,
    pub state: ParticlePlayState,
}

impl ParticleSystem {
    pub fn play(&mut self) {
        self.state = ParticlePlayState::Playing;
    }

    pub fn pause(&mut self) {
        self.state = ParticlePlayState::Paused;
    }

    pub fn stop(&mut self) {
        self.state = ParticlePlayState::Stopped;
    }

    pub fn update(&mut self, dt: f32) {
        if self.state == ParticlePlayState::Playing {
            self.time += dt;
        }
    }
}

// ---------------------------------------------------------------------------
// Trail
// ---------------------------------------------------------------------------

/// A trail that leaves a polyline behind a moving object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    /// How long, in seconds, a trail point survives.
    pub time: f32,
    pub emitting: bool,
    pub positions: Vec<Vec3>,
}

impl Default for Trail {
    fn default() -> Self {
        Self {
            time: 1.0,
            emitting: true,
            positions: Vec::new(),
        }
    }
}

impl Trail {
    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn add_position(&mut self, position: Vec3) {
        if self.emitting {
            self.positions.push(position);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_coordinates_follow_space() {
        let mut t = Transform::at(Vec3::new(1.0, 2.0, 3.0));
        t.set_coordinates(Space::Local, Vec3::new(9.0, 0.0, 0.0), Quat::IDENTITY);
        assert_eq!(t.coordinates(Space::World).0, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.coordinates(Space::Local).0, Vec3::new(9.0, 0.0, 0.0));
    }

    #[test]
    fn animator_rejects_parameter_of_wrong_kind() {
        let mut animator = Animator::default();
        animator
            .parameters
            .insert("grounded".into(), ParameterValue::Bool(false));
        assert!(!animator.set_parameter("grounded", ParameterValue::Float(1.0)));
        assert!(animator.set_parameter("grounded", ParameterValue::Bool(true)));
        assert!(!animator.set_parameter("missing", ParameterValue::Int(1)));
    }

    #[test]
    fn disabled_animator_does_not_advance() {
        let mut animator = Animator::default();
        animator.update(0.5);
        assert_eq!(animator.layers[0].normalized_time, 0.5);
        animator.enabled = false;
        animator.update(0.5);
        assert_eq!(animator.layers[0].normalized_time, 0.5);
    }

    #[test]
    fn trail_only_grows_while_emitting() {
        let mut trail = Trail::default();
        trail.add_position(Vec3::ZERO);
        trail.emitting = false;
        trail.add_position(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(trail.positions.len(), 1);
    }
}
