//! Spawn and dispose tracking for one entity.
//!
//! The [`LifetimeRecorder`] records the entity's activation flag each frame
//! and knows the frame it was spawned in and, once gameplay disposes of it,
//! the frame it was disposed in. From those it derives a [`LifetimeState`]
//! for any frame:
//!
//! ```text
//! frame < spawn                          -> Despawned
//! disposed and frame >= dispose frame    -> Disposed
//! no activation record at/before frame   -> Despawned
//! recorded active                        -> Active
//! otherwise                              -> Inactive
//! ```
//!
//! Playback shows the entity only while it is `Active`. Two moments turn
//! that into a real release:
//!
//! - resuming at a frame where the entity is `Despawned`, because the
//!   timeline was rewound to before the entity existed;
//! - the dispose frame leaving the retained window, because the disposal
//!   can no longer be rewound.

use rewind_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::object::ActiveFlag;

/// Lifecycle of an entity at a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifetimeState {
    /// Before the entity was spawned.
    Despawned,
    Active,
    /// Alive but deactivated by gameplay.
    Inactive,
    /// At or after a disposal that is still reversible.
    Disposed,
}

/// Activation flag captured per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifetimeSnapshot {
    pub active: bool,
}

/// Tracks spawn and dispose frames and drives release.
pub struct LifetimeRecorder {
    attachment: Attachment,
    active: ActiveFlag,
    spawn_frame: Frame,
    dispose_frame: Option<Frame>,
    history: SnapshotHistory<LifetimeSnapshot>,
}

impl LifetimeRecorder {
    pub fn new(active: ActiveFlag) -> Self {
        Self {
            attachment: Attachment::default(),
            active,
            spawn_frame: 0,
            dispose_frame: None,
            history: SnapshotHistory::default(),
        }
    }

    pub fn spawn_frame(&self) -> Frame {
        self.spawn_frame
    }

    pub fn dispose_frame(&self) -> Option<Frame> {
        self.dispose_frame
    }

    pub fn is_marked_for_disposal(&self) -> bool {
        self.dispose_frame.is_some()
    }

    /// Derive the state at `frame`.
    pub fn resolve(&self, frame: Frame) -> LifetimeState {
        if frame < self.spawn_frame {
            return LifetimeState::Despawned;
        }
        if self.dispose_frame.is_some_and(|dispose| frame >= dispose) {
            return LifetimeState::Disposed;
        }
        match self.activation_at(frame) {
            None => LifetimeState::Despawned,
            Some(true) => LifetimeState::Active,
            Some(false) => LifetimeState::Inactive,
        }
    }

    /// The activation flag in effect at `frame`: the newest entry at or
    /// before it, else the spawn-time flag.
    fn activation_at(&self, frame: Frame) -> Option<bool> {
        self.history
            .latest_at_or_before(frame)
            .map(|(_, snapshot)| snapshot.active)
            .or_else(|| self.history.spawn().map(|snapshot| snapshot.active))
    }

    /// Mark the entity disposed at the current frame and deactivate it.
    ///
    /// Returns `false` if a disposal is already pending. The earliest
    /// dispose frame is kept.
    pub fn dispose(&mut self, ctx: &mut RecorderContext<'_>) -> bool {
        let Some(owner) = self.attachment.owner() else {
            tracing::warn!("dispose on an unattached lifetime recorder");
            return false;
        };
        if let Some(frame) = self.dispose_frame {
            tracing::warn!(entity = %owner, dispose_frame = frame, "entity already disposed");
            return false;
        }
        let frame = ctx.frame();
        self.dispose_frame = Some(frame);
        self.active.set(false);
        tracing::debug!(entity = %owner, frame, "entity disposed");
        ctx.emit(TimelineEvent::Disposed { entity: owner });
        true
    }

    /// Clear a pending disposal.
    pub fn undispose(&mut self) {
        if let Some(frame) = self.dispose_frame.take() {
            tracing::debug!(entity = ?self.attachment.owner(), frame, "disposal reverted");
        }
    }

    /// Move the spawn frame back to zero after the history was reset.
    pub fn rebase(&mut self) {
        self.spawn_frame = 0;
    }
}

impl Recorder for LifetimeRecorder {
    fn label(&self) -> &str {
        "lifetime"
    }

    fn owner(&self) -> Option<EntityId> {
        self.attachment.owner()
    }

    fn subscription(&self) -> Option<SubscriptionId> {
        self.attachment.subscription()
    }

    fn snapshot_count(&self) -> usize {
        self.history.held()
    }

    fn attach(
        &mut self,
        owner: Option<EntityId>,
        ctx: &mut RecorderContext<'_>,
    ) -> Result<(), RewindError> {
        let owner = self.attachment.check(self.label(), owner)?;
        self.history = SnapshotHistory::default();
        self.attachment.bind(owner, ctx);
        self.spawn_frame = ctx.frame();
        self.dispose_frame = None;
        let active = self.active.get();
        self.history.set_spawn_with(ctx, |s| s.active = active);
        tracing::debug!(entity = %owner, spawn_frame = self.spawn_frame, "lifetime tracking attached");

        if ctx.is_paused() {
            self.on_pause(ctx);
        }
        Ok(())
    }

    fn on_tick(&mut self, frame: Frame, _delta: f64, ctx: &mut RecorderContext<'_>) {
        let active = self.active.get();
        self.history.record_with(frame, ctx, |s| s.active = active);
    }

    fn on_pause(&mut self, ctx: &mut RecorderContext<'_>) {
        let active = self.active.get();
        self.history.cache_with(ctx, |s| s.active = active);
    }

    fn on_resume(&mut self, ctx: &mut RecorderContext<'_>) {
        let Some(owner) = self.attachment.owner() else {
            return;
        };
        let frame = ctx.frame();
        match self.resolve(frame) {
            LifetimeState::Despawned => {
                tracing::debug!(entity = %owner, frame, spawn_frame = self.spawn_frame, "entity rewound out of the timeline");
                self.active.set(false);
                ctx.emit(TimelineEvent::Despawned { entity: owner });
                ctx.request_release(owner, ReleaseCause::Despawned);
            }
            // Released once the dispose frame is evicted.
            LifetimeState::Disposed => self.active.set(false),
            state @ (LifetimeState::Active | LifetimeState::Inactive) => {
                self.undispose();
                // At the live edge there is no entry yet; the freeze-point
                // flag wins over the newest earlier record.
                let active = self
                    .history
                    .resume_source(frame)
                    .map_or(state == LifetimeState::Active, |s| s.active);
                self.active.set(active);
            }
        }
    }

    fn on_seek(&mut self, frame: Frame, _ctx: &mut RecorderContext<'_>) {
        self.active.set(self.resolve(frame) == LifetimeState::Active);
    }

    fn on_evict(&mut self, frame: Frame, ctx: &mut RecorderContext<'_>) {
        self.history.evict(frame, ctx);
        if self.dispose_frame == Some(frame) {
            if let Some(owner) = self.attachment.owner() {
                tracing::debug!(entity = %owner, frame, "dispose frame evicted");
                ctx.request_release(owner, ReleaseCause::Disposed);
            }
        }
    }

    fn on_owner_destroyed(&mut self, ctx: &mut RecorderContext<'_>) {
        self.attachment.detach(ctx);
        self.history.release_all(ctx);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
