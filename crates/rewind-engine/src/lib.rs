//! Rewind Engine -- playback controller, entity registry, and host recorders.
//!
//! This crate builds on [`rewind_core`] to provide what a host simulation
//! loop talks to: a [`Timeline`](timeline::Timeline) that records every
//! tracked entity once per tick and can pause, scrub through the retained
//! window, and resume from any frame in it. Entities opt into lifetime
//! tracking so that rewinding past their spawn or their disposal hides them,
//! and disposals that age out of the window release them for good.
//!
//! # Quick Start
//!
//! ```
//! use rewind_engine::prelude::*;
//!
//! let mut timeline = Timeline::new(TimelineConfig {
//!     max_record_duration: 5.0,
//!     ..Default::default()
//! });
//!
//! let crate_pos = live(Transform::default());
//! let id = timeline.spawn("crate", true).unwrap();
//! timeline
//!     .attach(id, TransformProbe::recorder(Some(crate_pos.clone()), Space::World))
//!     .unwrap();
//!
//! for step in 0..100 {
//!     crate_pos.borrow_mut().position.y = -(step as f32);
//!     timeline.tick_fixed().unwrap();
//! }
//!
//! timeline.pause();
//! timeline.rewind(40);
//! assert_eq!(crate_pos.borrow().position.y, -60.0);
//!
//! timeline.resume();
//! assert_eq!(timeline.clock().max(), Some(59));
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod host;
pub mod lifetime;
pub mod logging;
pub mod object;
pub mod recorders;
pub mod timeline;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the core crate for convenience.
pub use rewind_core;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the core prelude.
    pub use rewind_core::prelude::*;

    // Engine-specific exports.
    pub use crate::config::TimelineConfig;
    pub use crate::lifetime::{LifetimeRecorder, LifetimeState};
    pub use crate::logging::init_tracing;
    pub use crate::object::{ActiveFlag, ObjectRegistry, ReleaseHook, TimeObject};
    pub use crate::timeline::{ListenerId, SceneLoadMode, ScrubRange, Timeline};

    // Host objects.
    pub use crate::host::{
        live, Animator, Body3d, LayerState, Live, ParameterKind, ParameterValue,
        ParticlePlayState, ParticleSystem, Quat, Space, Trail, Transform, Vec2, Vec3,
    };

    // Recorder variants.
    pub use crate::recorders::physics::{BodyDesc, ColliderShape, PhysicsBodyType};
    pub use crate::recorders::{
        AnimatorRecorder, CoordinateSource, ParticleProbe, ParticleRecorder, PhysicsWorld,
        PropertyHost, PropertyKind, PropertyRegistry, PropertyValue, RigidBody2dProbe,
        RigidBody2dRecorder, RigidbodyProbe, RigidbodyRecorder, TimeField, TimeValue,
        TimeVariable, TrailProbe, TrailRecorder, TransformProbe, TransformRecorder,
    };
}
