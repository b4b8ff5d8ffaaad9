//! Rewind Core -- frame clock, snapshot pools, and the recorder contract.
//!
//! This crate holds the engine-agnostic half of the rewind system. A
//! [`FrameClock`](frame::FrameClock) numbers simulation ticks and keeps a
//! bounded window of recorded frames. Every tracked property of every entity
//! is a [`Recorder`](recorder::Recorder) that captures a pooled snapshot per
//! frame and can re-apply any retained frame on demand. Snapshot values are
//! leased from a per-type [`SnapshotPool`](pool::SnapshotPool) so that the
//! steady record/evict cycle does not allocate.
//!
//! # Quick Start
//!
//! ```
//! use rewind_core::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Height(f32);
//!
//! struct HeightProbe {
//!     height: std::rc::Rc<std::cell::Cell<f32>>,
//! }
//!
//! impl Recordable for HeightProbe {
//!     type Snapshot = Height;
//!
//!     fn read(&self, snapshot: &mut Height) {
//!         snapshot.0 = self.height.get();
//!     }
//!
//!     fn apply(&mut self, snapshot: &Height) {
//!         self.height.set(snapshot.0);
//!     }
//! }
//!
//! let height = std::rc::Rc::new(std::cell::Cell::new(1.0));
//! let mut recorder = SnapshotRecorder::new("height", HeightProbe { height: height.clone() });
//!
//! let mut clock = FrameClock::new(FrameCapacity::default());
//! let mut pools = PoolRegistry::new(clock.capacity().prediction());
//! let mut outbox = Outbox::default();
//!
//! let owner = EntityId::new(0, 0);
//! let mut ctx = RecorderContext::new(&mut clock, &mut pools, &mut outbox, PlaybackState::Recording);
//! recorder.attach(Some(owner), &mut ctx).unwrap();
//!
//! recorder.on_tick(0, 1.0 / 60.0, &mut ctx);
//! height.set(5.0);
//! recorder.on_seek(0, &mut ctx);
//! assert_eq!(height.get(), 1.0);
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod event;
pub mod frame;
pub mod pool;
pub mod recorder;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the rewind core.
///
/// Invalid playback operations (seeking while recording, pausing twice) are
/// not errors: they are rejected with a `false` return and a log line. The
/// variants here are the unrecoverable conditions that must stop the attach
/// or tick that raised them.
#[derive(Debug, thiserror::Error)]
pub enum RewindError {
    /// A recorder was attached without an owning entity, or the owner is not
    /// registered with the timeline.
    #[error("invalid owner passed to recorder '{recorder}'")]
    InvalidOwner { recorder: String },

    /// A recorder was attached a second time.
    #[error("recorder '{recorder}' is already attached to {owner}")]
    AlreadyAttached {
        recorder: String,
        owner: entity::EntityId,
    },

    /// The live object a recorder reads from could not be located.
    #[error("recorder '{recorder}' is missing its dependency: {dependency}")]
    MissingDependency { recorder: String, dependency: String },

    /// The clock was asked to register a frame that already has a delta
    /// entry. Indicates a double tick in the host loop.
    #[error("frame {frame} already registered (newest retained frame is {max})")]
    FrameAlreadyRegistered { frame: frame::Frame, max: frame::Frame },

    /// An operation referenced an entity the registry does not know.
    #[error("entity {entity} is not registered with the timeline")]
    UnknownEntity { entity: entity::EntityId },

    /// A configuration value is out of range or could not be parsed.
    #[error("invalid timeline configuration: {reason}")]
    InvalidConfig { reason: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::event::{Outbox, ReleaseCause, ReleaseRequest, TimelineEvent};
    pub use crate::frame::{
        Frame, FrameCapacity, FrameClock, FrameStamp, PlaybackState, SubscriptionId,
    };
    pub use crate::pool::{PoolRegistry, PoolStats, SnapshotPool};
    pub use crate::recorder::{
        deliver, Attachment, ClockEvent, Recordable, Recorder, RecorderContext, Snapshot,
        SnapshotHistory, SnapshotRecorder,
    };
    pub use crate::RewindError;
}
