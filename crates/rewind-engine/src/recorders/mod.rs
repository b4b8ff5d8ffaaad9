//! Recorders for the host capabilities the timeline knows about.
//!
//! Each submodule wraps one kind of live host object. Most are a
//! [`Recordable`](rewind_core::recorder::Recordable) probe driven by
//! [`SnapshotRecorder`](rewind_core::recorder::SnapshotRecorder); the
//! animator is a composite that implements
//! [`Recorder`](rewind_core::recorder::Recorder) directly.

pub mod animator;
pub mod particles;
pub mod physics;
pub mod property;
pub mod rigidbody;
pub mod trail;
pub mod transform;
pub mod variable;

pub use animator::AnimatorRecorder;
pub use particles::{ParticleProbe, ParticleRecorder};
pub use physics::{PhysicsWorld, RigidBody2dProbe, RigidBody2dRecorder};
pub use property::{PropertyHost, PropertyKind, PropertyRegistry, PropertyValue};
pub use rigidbody::{CoordinateSource, RigidbodyProbe, RigidbodyRecorder};
pub use trail::{TrailProbe, TrailRecorder};
pub use transform::{TransformProbe, TransformRecorder};
pub use variable::{TimeField, TimeValue, TimeVariable};

/// Reads live state, applies it back, reads again, and asserts both reads
/// match exactly. Returns the snapshot.
#[cfg(test)]
pub(crate) fn assert_round_trip<R>(probe: &mut R) -> R::Snapshot
where
    R: rewind_core::recorder::Recordable,
    R::Snapshot: PartialEq + std::fmt::Debug,
{
    let mut first = R::Snapshot::default();
    probe.read(&mut first);
    probe.apply(&first);
    let mut second = R::Snapshot::default();
    probe.read(&mut second);
    assert_eq!(first, second);
    second
}
