//! Outward notifications and deferred release requests.
//!
//! Recorders never reach out of a dispatch pass to destroy their owner or to
//! call host code directly. They post to the [`Outbox`] instead, and the
//! timeline drains it once the pass over all recorders has completed, so no
//! listener ever observes a partially applied frame.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::frame::Frame;

// ---------------------------------------------------------------------------
// ReleaseCause
// ---------------------------------------------------------------------------

/// Why an entity was released from the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseCause {
    /// Playback resumed at a frame before the entity was spawned.
    Despawned,
    /// The entity's dispose frame aged out of the retention window.
    Disposed,
}

// ---------------------------------------------------------------------------
// TimelineEvent
// ---------------------------------------------------------------------------

/// Notifications surfaced to UI and gameplay collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimelineEvent {
    Paused,
    Resumed { frame: Frame },
    Seeked { frame: Frame },
    FrameEvicted { frame: Frame },
    /// The entity was rewound out of existence and is about to be released.
    Despawned { entity: EntityId },
    /// Gameplay disposed the entity; reversible until its frame is evicted.
    Disposed { entity: EntityId },
    /// The entity's release strategy ran.
    Released { entity: EntityId, cause: ReleaseCause },
    /// The entity and all its recorders were torn down.
    Destroyed { entity: EntityId },
}

// ---------------------------------------------------------------------------
// ReleaseRequest
// ---------------------------------------------------------------------------

/// A request, posted during a dispatch pass, to release an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub entity: EntityId,
    pub cause: ReleaseCause,
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Events and release requests accumulated during one pass.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<TimelineEvent>,
    releases: Vec<ReleaseRequest>,
}

impl Outbox {
    pub fn emit(&mut self, event: TimelineEvent) {
        self.events.push(event);
    }

    /// Queue a release. Duplicate requests for the same entity collapse into
    /// the first one, so an entity is released at most once per pass.
    pub fn request_release(&mut self, entity: EntityId, cause: ReleaseCause) {
        if self.releases.iter().any(|r| r.entity == entity) {
            return;
        }
        self.releases.push(ReleaseRequest { entity, cause });
    }

    /// Take all pending events, oldest first.
    pub fn take_events(&mut self) -> Vec<TimelineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take all pending release requests, in the order they were posted.
    pub fn take_releases(&mut self) -> Vec<ReleaseRequest> {
        std::mem::take(&mut self.releases)
    }

    pub fn has_pending_releases(&self) -> bool {
        !self.releases.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.releases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_release_requests_collapse() {
        let mut outbox = Outbox::default();
        let e = EntityId::new(1, 0);
        outbox.request_release(e, ReleaseCause::Despawned);
        outbox.request_release(e, ReleaseCause::Disposed);
        let releases = outbox.take_releases();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].cause, ReleaseCause::Despawned);
        assert!(outbox.is_empty());
    }

    #[test]
    fn events_drain_in_order() {
        let mut outbox = Outbox::default();
        outbox.emit(TimelineEvent::Paused);
        outbox.emit(TimelineEvent::Seeked { frame: 3 });
        assert_eq!(
            outbox.take_events(),
            vec![TimelineEvent::Paused, TimelineEvent::Seeked { frame: 3 }]
        );
        assert!(outbox.take_events().is_empty());
    }
}
