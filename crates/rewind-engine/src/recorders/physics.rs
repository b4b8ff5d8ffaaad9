//! rapier2d bodies.
//!
//! [`PhysicsWorld`] is a thin owner of a rapier2d simulation keyed by
//! [`EntityId`]. [`RigidBody2dProbe`] records one of its bodies: translation,
//! rotation, linear and angular velocity, and body type.
//!
//! The rotation is kept as rapier's unit complex number rather than an
//! angle, so writing a snapshot back restores the exact bits that were read.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. With a fixed timestep,
//! restoring a recorded frame and stepping again reproduces the frames that
//! followed it on the same platform.

use std::collections::HashMap;

use rapier2d::prelude::*;
use rewind_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::host::{Live, Vec2};

// ---------------------------------------------------------------------------
// Body description
// ---------------------------------------------------------------------------

/// How rapier treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhysicsBodyType {
    /// Fully simulated (e.g. a projectile).
    #[default]
    Dynamic,
    /// Moved by velocity set from game code.
    Kinematic,
    /// Moved by position set from game code. Used while paused.
    KinematicPosition,
    /// Immovable (e.g. walls).
    Static,
}

impl From<RigidBodyType> for PhysicsBodyType {
    fn from(body_type: RigidBodyType) -> Self {
        match body_type {
            RigidBodyType::Dynamic => Self::Dynamic,
            RigidBodyType::KinematicVelocityBased => Self::Kinematic,
            RigidBodyType::KinematicPositionBased => Self::KinematicPosition,
            RigidBodyType::Fixed => Self::Static,
        }
    }
}

impl From<PhysicsBodyType> for RigidBodyType {
    fn from(body_type: PhysicsBodyType) -> Self {
        match body_type {
            PhysicsBodyType::Dynamic => Self::Dynamic,
            PhysicsBodyType::Kinematic => Self::KinematicVelocityBased,
            PhysicsBodyType::KinematicPosition => Self::KinematicPositionBased,
            PhysicsBodyType::Static => Self::Fixed,
        }
    }
}

/// Collider shape for physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Axis-aligned box with half-extents.
    Box { half_width: f32, half_height: f32 },
    Circle { radius: f32 },
}

/// Everything needed to create a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub body_type: PhysicsBodyType,
    pub position: Vec2,
    pub velocity: Vec2,
    pub collider: ColliderShape,
    /// Coefficient of restitution. 0.0 = no bounce, 1.0 = perfect bounce.
    pub restitution: f32,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            body_type: PhysicsBodyType::Dynamic,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            collider: ColliderShape::Circle { radius: 0.5 },
            restitution: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// A rapier2d simulation with bodies registered per entity.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Raw entity id -> rapier body.
    entity_to_body: HashMap<u64, RigidBodyHandle>,
}

impl PhysicsWorld {
    pub fn new(gravity_x: f32, gravity_y: f32) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity_x as Real, gravity_y as Real],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            entity_to_body: HashMap::new(),
        }
    }

    /// Create a body and collider for `entity`. A no-op if it already has one.
    pub fn register_entity(&mut self, entity: EntityId, desc: &BodyDesc) {
        let raw_id = entity.to_raw();
        if self.entity_to_body.contains_key(&raw_id) {
            return;
        }

        let body = RigidBodyBuilder::new(desc.body_type.into())
            .translation(vector![desc.position.x as Real, desc.position.y as Real])
            .linvel(vector![desc.velocity.x as Real, desc.velocity.y as Real])
            .build();
        let handle = self.rigid_body_set.insert(body);
        self.entity_to_body.insert(raw_id, handle);

        let shape = match desc.collider {
            ColliderShape::Box {
                half_width,
                half_height,
            } => SharedShape::cuboid(half_width as Real, half_height as Real),
            ColliderShape::Circle { radius } => SharedShape::ball(radius as Real),
        };
        let collider = ColliderBuilder::new(shape)
            .restitution(desc.restitution as Real)
            .build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
    }

    /// Remove `entity`'s body and colliders. A no-op if it has none.
    pub fn unregister_entity(&mut self, entity: EntityId) {
        if let Some(handle) = self.entity_to_body.remove(&entity.to_raw()) {
            self.rigid_body_set.remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
        }
    }

    pub fn handle_of(&self, entity: EntityId) -> Option<RigidBodyHandle> {
        self.entity_to_body.get(&entity.to_raw()).copied()
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// Current translation of `entity`'s body.
    pub fn position_of(&self, entity: EntityId) -> Option<Vec2> {
        let body = self.body(self.handle_of(entity)?)?;
        let translation = body.translation();
        Some(Vec2::new(translation.x, translation.y))
    }

    /// Step the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt as Real;
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(0.0, -9.81)
    }
}

// ---------------------------------------------------------------------------
// RigidBody2dProbe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody2dSnapshot {
    pub position: Vec2,
    pub rotation: Rotation<Real>,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub body_type: PhysicsBodyType,
}

impl Default for RigidBody2dSnapshot {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: Rotation::identity(),
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            body_type: PhysicsBodyType::default(),
        }
    }
}

impl RigidBody2dSnapshot {
    /// Rotation angle in radians.
    pub fn angle(&self) -> f32 {
        self.rotation.angle()
    }
}

/// Records the rapier body registered for one entity.
pub struct RigidBody2dProbe {
    world: Live<PhysicsWorld>,
    entity: EntityId,
    handle: Option<RigidBodyHandle>,
}

pub type RigidBody2dRecorder = SnapshotRecorder<RigidBody2dProbe>;

impl RigidBody2dProbe {
    pub fn new(world: Live<PhysicsWorld>, entity: EntityId) -> Self {
        Self {
            world,
            entity,
            handle: None,
        }
    }

    pub fn recorder(world: Live<PhysicsWorld>, entity: EntityId) -> RigidBody2dRecorder {
        SnapshotRecorder::new("rigidbody2d", Self::new(world, entity))
    }

    fn set_body_type(&mut self, body_type: PhysicsBodyType) {
        let Some(handle) = self.handle else { return };
        if let Some(body) = self.world.borrow_mut().body_mut(handle) {
            body.set_body_type(body_type.into(), true);
        }
    }
}

impl Recordable for RigidBody2dProbe {
    type Snapshot = RigidBody2dSnapshot;

    fn configure(&mut self) -> Result<(), RewindError> {
        self.handle = self.world.borrow().handle_of(self.entity);
        if self.handle.is_none() {
            return Err(RewindError::MissingDependency {
                recorder: "rigidbody2d".into(),
                dependency: format!("physics body for {}", self.entity),
            });
        }
        Ok(())
    }

    fn read(&self, snapshot: &mut RigidBody2dSnapshot) {
        let world = self.world.borrow();
        let Some(body) = self.handle.and_then(|handle| world.body(handle)) else {
            // Body removed from the world: record a neutral pose.
            *snapshot = RigidBody2dSnapshot::default();
            return;
        };
        let translation = body.translation();
        let linvel = body.linvel();
        snapshot.position = Vec2::new(translation.x, translation.y);
        snapshot.rotation = *body.rotation();
        snapshot.velocity = Vec2::new(linvel.x, linvel.y);
        snapshot.angular_velocity = body.angvel();
        snapshot.body_type = body.body_type().into();
    }

    fn apply(&mut self, snapshot: &RigidBody2dSnapshot) {
        let Some(handle) = self.handle else { return };
        let mut world = self.world.borrow_mut();
        let Some(body) = world.body_mut(handle) else {
            return;
        };
        body.set_translation(vector![snapshot.position.x, snapshot.position.y], true);
        body.set_rotation(snapshot.rotation, true);
        body.set_linvel(vector![snapshot.velocity.x, snapshot.velocity.y], true);
        body.set_angvel(snapshot.angular_velocity, true);
    }

    fn pause(&mut self) {
        self.set_body_type(PhysicsBodyType::KinematicPosition);
    }

    fn resume(&mut self, snapshot: &RigidBody2dSnapshot) {
        self.set_body_type(snapshot.body_type);
        self.apply(snapshot);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
