//! The playback controller.
//!
//! A [`Timeline`] owns the frame clock, the snapshot pools and every tracked
//! entity, and drives them through two states:
//!
//! - **Recording**: each [`tick`](Timeline::tick) registers a frame, evicts
//!   frames beyond the retention budget, lets every recorder capture, and
//!   then advances the frame index.
//! - **Paused**: [`seek`](Timeline::seek), [`rewind`](Timeline::rewind) and
//!   [`forward`](Timeline::forward) move the index within the retained
//!   window and every recorder applies that frame. [`resume`](Timeline::resume)
//!   reapplies the current frame, discards the unreachable future, and
//!   returns to recording.
//!
//! Every pass over the recorders runs to completion before anything is
//! reported outward. Release requests and notifications posted during a
//! pass are buffered and handled once the pass is over.
//!
//! # Example
//!
//! ```
//! use rewind_engine::prelude::*;
//!
//! let mut timeline = Timeline::new(TimelineConfig::default());
//! let position = live(Transform::default());
//! let ball = timeline.spawn("ball", false).unwrap();
//! timeline
//!     .attach(ball, TransformProbe::recorder(Some(position.clone()), Space::World))
//!     .unwrap();
//!
//! for frame in 0..10 {
//!     position.borrow_mut().position.x = frame as f32;
//!     timeline.tick(1.0 / 60.0).unwrap();
//! }
//!
//! assert!(timeline.pause());
//! assert!(timeline.seek(3));
//! assert_eq!(position.borrow().position.x, 3.0);
//! ```

use serde::{Deserialize, Serialize};

use rewind_core::prelude::*;

use crate::config::TimelineConfig;
use crate::lifetime::{LifetimeRecorder, LifetimeState};
use crate::object::{ObjectRegistry, TimeObject};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// How a scene was loaded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneLoadMode {
    /// Replaces every loaded scene.
    Single,
    /// Adds to the loaded scenes.
    Additive,
}

/// The range a scrub bar can move over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrubRange {
    pub min: Frame,
    pub max: Frame,
    pub current: Frame,
}

/// Token returned by [`Timeline::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&TimelineEvent)>;

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// Records every tracked entity each tick and plays recorded frames back.
pub struct Timeline {
    config: TimelineConfig,
    clock: FrameClock,
    pools: PoolRegistry,
    objects: ObjectRegistry,
    state: PlaybackState,
    /// Events and release requests posted during the current pass.
    outbox: Outbox,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    /// Reused buffer of frames evicted during one operation.
    evicted: Vec<Frame>,
}

impl Timeline {
    /// Create a timeline at frame 0 in the recording state.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`TimelineConfig::validate`].
    pub fn new(config: TimelineConfig) -> Self {
        if let Err(err) = config.validate() {
            panic!("{err}");
        }
        let capacity = config.capacity();
        Self {
            clock: FrameClock::new(capacity),
            pools: PoolRegistry::new(capacity.prediction()),
            objects: ObjectRegistry::new(),
            state: PlaybackState::Recording,
            outbox: Outbox::default(),
            listeners: Vec::new(),
            next_listener: 0,
            evicted: Vec::new(),
            config,
        }
    }

    // -- entities -----------------------------------------------------------

    /// Register a new entity at the current frame.
    ///
    /// With `record_lifetime` the entity gets a [`LifetimeRecorder`], which
    /// makes it disposable and lets rewinding past its spawn frame
    /// despawn it.
    pub fn spawn(&mut self, name: &str, record_lifetime: bool) -> Result<EntityId, RewindError> {
        let object = self.objects.create(name);
        let id = object.id();
        if record_lifetime {
            let mut lifetime = LifetimeRecorder::new(object.active_flag());
            let mut ctx = RecorderContext::new(
                &mut self.clock,
                &mut self.pools,
                &mut self.outbox,
                self.state,
            );
            if let Err(err) = lifetime.attach(Some(id), &mut ctx) {
                self.objects.remove(id);
                return Err(err);
            }
            object.set_lifetime(lifetime);
        }
        tracing::debug!(entity = %id, entity_name = name, frame = self.clock.index(), record_lifetime, "entity spawned");
        Ok(id)
    }

    /// Attach `recorder` to `entity`.
    ///
    /// # Errors
    ///
    /// [`RewindError::UnknownEntity`] if `entity` is not registered, or
    /// whatever the recorder's attach reports. A recorder that fails to
    /// attach is dropped.
    pub fn attach(
        &mut self,
        entity: EntityId,
        recorder: impl Recorder + 'static,
    ) -> Result<(), RewindError> {
        self.attach_boxed(entity, Box::new(recorder))
    }

    /// Attach an already boxed recorder to `entity`.
    pub fn attach_boxed(
        &mut self,
        entity: EntityId,
        mut recorder: Box<dyn Recorder>,
    ) -> Result<(), RewindError> {
        let Some(object) = self.objects.get_mut(entity) else {
            tracing::error!(entity = %entity, recorder = recorder.label(), "attach to unknown entity");
            return Err(RewindError::UnknownEntity { entity });
        };
        let mut ctx = RecorderContext::new(
            &mut self.clock,
            &mut self.pools,
            &mut self.outbox,
            self.state,
        );
        recorder.attach(Some(entity), &mut ctx)?;
        object.push_recorder(recorder);
        Ok(())
    }

    /// Install the destruction strategy for `entity`.
    pub fn set_release_hook(
        &mut self,
        entity: EntityId,
        hook: impl FnMut(EntityId, ReleaseCause) + 'static,
    ) -> bool {
        match self.objects.get_mut(entity) {
            Some(object) => {
                object.set_release_hook(hook);
                true
            }
            None => false,
        }
    }

    /// Dispose of `entity` in a way that can be rewound.
    ///
    /// Returns `false` for unknown entities, for entities without lifetime
    /// tracking, and when a disposal is already pending.
    pub fn dispose(&mut self, entity: EntityId) -> bool {
        let Some(object) = self.objects.get_mut(entity) else {
            tracing::warn!(entity = %entity, "dispose of unknown entity");
            return false;
        };
        let Some(lifetime) = object.lifetime_mut() else {
            tracing::debug!(entity = %entity, "dispose without lifetime tracking");
            return false;
        };
        let mut ctx = RecorderContext::new(
            &mut self.clock,
            &mut self.pools,
            &mut self.outbox,
            self.state,
        );
        let disposed = lifetime.dispose(&mut ctx);
        self.flush();
        disposed
    }

    /// Toggle an entity's activation from gameplay code.
    ///
    /// Rejected while paused, since playback owns activation then, and for
    /// entities with a pending disposal.
    pub fn set_active(&mut self, entity: EntityId, active: bool) -> bool {
        if self.is_paused() {
            tracing::warn!(entity = %entity, "cannot change activation while paused");
            return false;
        }
        let Some(object) = self.objects.get(entity) else {
            tracing::warn!(entity = %entity, "set_active on unknown entity");
            return false;
        };
        if object.is_marked_for_disposal() {
            tracing::warn!(entity = %entity, "cannot change activation of a disposed entity");
            return false;
        }
        object.active_flag().set(active);
        true
    }

    /// Tear down `entity` immediately, without running its release hook.
    ///
    /// Used when the host destroyed the entity itself. Returns `false` for
    /// unknown entities.
    pub fn destroy(&mut self, entity: EntityId) -> bool {
        let Some(mut object) = self.objects.remove(entity) else {
            return false;
        };
        self.teardown(&mut object);
        self.flush();
        true
    }

    // -- recording ----------------------------------------------------------

    /// Record one frame that lasted `delta` seconds.
    ///
    /// Returns the recorded frame, or `None` while paused.
    ///
    /// # Errors
    ///
    /// [`RewindError::FrameAlreadyRegistered`] if the clock already holds
    /// the current frame. Nothing is recorded in that case.
    pub fn tick(&mut self, delta: f64) -> Result<Option<Frame>, RewindError> {
        if self.is_paused() {
            return Ok(None);
        }
        let frame = self.clock.index();
        self.clock.register_frame(delta)?;

        let mut evicted = std::mem::take(&mut self.evicted);
        self.clock
            .fit_to_budget(self.config.max_record_duration, |f| evicted.push(f));
        self.evict_frames(&evicted);
        evicted.clear();
        self.evicted = evicted;

        self.dispatch(ClockEvent::Tick { frame, delta });
        self.clock.advance();
        self.flush();
        Ok(Some(frame))
    }

    /// Record one frame of the configured fixed delta.
    pub fn tick_fixed(&mut self) -> Result<Option<Frame>, RewindError> {
        self.tick(self.config.fixed_dt)
    }

    /// Record `count` fixed frames. Returns how many were recorded.
    pub fn run_ticks(&mut self, count: u64) -> Result<u64, RewindError> {
        let mut recorded = 0;
        for _ in 0..count {
            if self.tick_fixed()?.is_some() {
                recorded += 1;
            }
        }
        Ok(recorded)
    }

    // -- playback -----------------------------------------------------------

    /// Stop recording and freeze every recorder.
    ///
    /// Returns `false` if already paused.
    pub fn pause(&mut self) -> bool {
        if self.is_paused() {
            tracing::warn!("timeline already paused");
            return false;
        }
        self.state = PlaybackState::Paused;
        self.dispatch(ClockEvent::Pause);
        self.outbox.emit(TimelineEvent::Paused);
        tracing::debug!(frame = self.clock.index(), "timeline paused");
        self.flush();
        true
    }

    /// Resume recording from the current frame.
    ///
    /// Every recorder reapplies the current frame, entities rewound before
    /// their spawn are released, and all frames from the current one on are
    /// discarded. Returns `false` if already recording.
    pub fn resume(&mut self) -> bool {
        if !self.is_paused() {
            tracing::warn!("timeline already recording");
            return false;
        }
        self.state = PlaybackState::Recording;
        let frame = self.clock.index();
        self.dispatch(ClockEvent::Resume);
        self.outbox.emit(TimelineEvent::Resumed { frame });
        self.release_pending();

        let mut evicted = std::mem::take(&mut self.evicted);
        let discarded = self.clock.clear_from(frame, |f| evicted.push(f));
        self.evict_frames(&evicted);
        evicted.clear();
        self.evicted = evicted;

        tracing::debug!(frame, discarded, "timeline resumed");
        self.flush();
        true
    }

    /// Move playback to `frame` and apply it to every recorder.
    ///
    /// Returns `false` while recording or when `frame` lies outside the
    /// retained window. Seeking to the current frame succeeds without
    /// doing anything.
    pub fn seek(&mut self, frame: Frame) -> bool {
        if !self.is_paused() {
            tracing::error!(frame, "cannot seek while recording");
            return false;
        }
        if frame == self.clock.index() {
            return true;
        }
        if !self.clock.scrub_to(frame) {
            tracing::debug!(frame, min = ?self.clock.min(), max = ?self.clock.max(), "seek outside retained window");
            return false;
        }
        self.dispatch(ClockEvent::Seek(frame));
        self.outbox.emit(TimelineEvent::Seeked { frame });
        self.flush();
        true
    }

    /// Seek `steps` frames back.
    pub fn rewind(&mut self, steps: u64) -> bool {
        match self.clock.index().checked_sub(steps) {
            Some(frame) => self.seek(frame),
            None => false,
        }
    }

    /// Seek `steps` frames forward.
    pub fn forward(&mut self, steps: u64) -> bool {
        match self.clock.index().checked_add(steps) {
            Some(frame) => self.seek(frame),
            None => false,
        }
    }

    // -- session boundaries -------------------------------------------------

    /// Drop all history and restart numbering at frame 0.
    ///
    /// Pending disposals can no longer be undone and are released. Every
    /// surviving entity counts as spawned at frame 0.
    pub fn reset(&mut self) {
        let mut evicted = std::mem::take(&mut self.evicted);
        let count = self.clock.reset(|f| evicted.push(f));
        {
            let mut ctx = RecorderContext::new(
                &mut self.clock,
                &mut self.pools,
                &mut self.outbox,
                self.state,
            );
            for &frame in &evicted {
                for object in self.objects.iter_mut() {
                    object.dispatch(ClockEvent::Evict(frame), &mut ctx);
                }
            }
            for object in self.objects.iter_mut() {
                if object.is_marked_for_disposal() {
                    ctx.request_release(object.id(), ReleaseCause::Disposed);
                }
            }
        }
        evicted.clear();
        self.evicted = evicted;
        self.release_pending();

        for object in self.objects.iter_mut() {
            if let Some(lifetime) = object.lifetime_mut() {
                lifetime.rebase();
            }
        }
        tracing::debug!(evicted = count, "timeline reset");
        self.flush();
    }

    /// React to the host loading a scene. Returns whether history was reset.
    pub fn on_scene_loaded(&mut self, mode: SceneLoadMode) -> bool {
        if self.config.clear_on_scene_load && mode == SceneLoadMode::Single {
            self.reset();
            true
        } else {
            false
        }
    }

    // -- listeners ----------------------------------------------------------

    /// Register a callback for every [`TimelineEvent`].
    pub fn add_listener(&mut self, listener: impl FnMut(&TimelineEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    // -- configuration ------------------------------------------------------

    /// Change the retention budget. Takes effect on the next tick; pools
    /// already created keep their size.
    pub fn set_max_record_duration(&mut self, seconds: f64) -> bool {
        if !(seconds > 0.0 && seconds.is_finite()) {
            tracing::warn!(seconds, "ignoring invalid max record duration");
            return false;
        }
        self.config.max_record_duration = seconds;
        self.refresh_capacity();
        true
    }

    /// Change the frame rate used for capacity prediction.
    pub fn set_target_fps(&mut self, fps: Option<u32>) {
        self.config.target_fps = fps;
        self.refresh_capacity();
    }

    fn refresh_capacity(&mut self) {
        let capacity = self.config.capacity();
        self.clock.set_capacity(capacity);
        self.pools.set_capacity_hint(capacity.prediction());
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    /// The current frame index.
    pub fn frame(&self) -> Frame {
        self.clock.index()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn pools(&self) -> &PoolRegistry {
        &self.pools
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn object(&self, entity: EntityId) -> Option<&TimeObject> {
        self.objects.get(entity)
    }

    /// Lifetime state of `entity` at the current frame.
    pub fn lifetime_state(&self, entity: EntityId) -> Option<LifetimeState> {
        self.objects
            .get(entity)?
            .lifetime_state(self.clock.index())
    }

    pub fn is_active(&self, entity: EntityId) -> Option<bool> {
        self.objects.get(entity).map(TimeObject::is_active)
    }

    /// The retained window and current frame, `None` before the first tick.
    pub fn scrub_range(&self) -> Option<ScrubRange> {
        Some(ScrubRange {
            min: self.clock.min()?,
            max: self.clock.max()?,
            current: self.clock.index(),
        })
    }

    // -- internals ----------------------------------------------------------

    /// Fan `event` out to every entity in spawn order.
    fn dispatch(&mut self, event: ClockEvent) {
        let mut ctx = RecorderContext::new(
            &mut self.clock,
            &mut self.pools,
            &mut self.outbox,
            self.state,
        );
        for object in self.objects.iter_mut() {
            object.dispatch(event, &mut ctx);
        }
    }

    fn evict_frames(&mut self, frames: &[Frame]) {
        for &frame in frames {
            self.dispatch(ClockEvent::Evict(frame));
            self.outbox.emit(TimelineEvent::FrameEvicted { frame });
        }
    }

    /// Run every queued release. Releases can queue further releases only
    /// through teardown, so this settles in one or two rounds.
    fn release_pending(&mut self) {
        while self.outbox.has_pending_releases() {
            for request in self.outbox.take_releases() {
                self.release(request.entity, request.cause);
            }
        }
    }

    fn release(&mut self, entity: EntityId, cause: ReleaseCause) {
        let Some(mut object) = self.objects.remove(entity) else {
            return;
        };
        tracing::debug!(entity = %entity, ?cause, frame = self.clock.index(), "entity released");
        object.run_release_hook(cause);
        self.outbox.emit(TimelineEvent::Released { entity, cause });
        self.teardown(&mut object);
    }

    fn teardown(&mut self, object: &mut TimeObject) {
        let mut ctx = RecorderContext::new(
            &mut self.clock,
            &mut self.pools,
            &mut self.outbox,
            self.state,
        );
        object.teardown(&mut ctx);
        ctx.emit(TimelineEvent::Destroyed { entity: object.id() });
    }

    /// Settle pending releases, then deliver buffered events to listeners.
    fn flush(&mut self) {
        self.release_pending();
        let events = self.outbox.take_events();
        if events.is_empty() {
            return;
        }
        for event in &events {
            for (_, listener) in &mut self.listeners {
                listener(event);
            }
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(TimelineConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::host::{live, Space, Transform};
    use crate::recorders::transform::TransformProbe;

    fn timeline() -> Timeline {
        Timeline::new(TimelineConfig::default())
    }

    fn record_events(timeline: &mut Timeline) -> Rc<RefCell<Vec<TimelineEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        timeline.add_listener(move |event| sink.borrow_mut().push(event.clone()));
        events
    }

    // -- 1. Construction ----------------------------------------------------

    #[test]
    fn new_timeline_records_from_frame_zero() {
        let t = timeline();
        assert_eq!(t.frame(), 0);
        assert_eq!(t.state(), PlaybackState::Recording);
        assert!(t.scrub_range().is_none());
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn invalid_config_panics() {
        Timeline::new(TimelineConfig {
            fixed_dt: 0.0,
            ..Default::default()
        });
    }

    // -- 2. Recording -------------------------------------------------------

    #[test]
    fn tick_advances_and_reports_frame() {
        let mut t = timeline();
        assert_eq!(t.tick(0.1).unwrap(), Some(0));
        assert_eq!(t.tick(0.1).unwrap(), Some(1));
        assert_eq!(t.frame(), 2);
        assert_eq!(
            t.scrub_range(),
            Some(ScrubRange {
                min: 0,
                max: 1,
                current: 2
            })
        );
    }

    #[test]
    fn tick_while_paused_records_nothing() {
        let mut t = timeline();
        t.tick(0.1).unwrap();
        t.pause();
        assert_eq!(t.tick(0.1).unwrap(), None);
        assert_eq!(t.clock().len(), 1);
    }

    #[test]
    fn run_ticks_uses_fixed_delta() {
        let mut t = timeline();
        assert_eq!(t.run_ticks(6).unwrap(), 6);
        assert!((t.clock().retained_duration() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn retention_budget_evicts_oldest_frames() {
        let mut t = Timeline::new(TimelineConfig {
            max_record_duration: 1.0,
            ..Default::default()
        });
        let events = record_events(&mut t);
        for _ in 0..8 {
            t.tick(0.25).unwrap();
        }
        assert_eq!(t.clock().min(), Some(4));
        let evicted: Vec<Frame> = events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                TimelineEvent::FrameEvicted { frame } => Some(*frame),
                _ => None,
            })
            .collect();
        assert_eq!(evicted, vec![0, 1, 2, 3]);
    }

    // -- 3. Playback state machine -------------------------------------------

    #[test]
    fn pause_and_resume_reject_repeats() {
        let mut t = timeline();
        assert!(!t.resume());
        assert!(t.pause());
        assert!(!t.pause());
        assert!(t.resume());
        assert!(!t.resume());
    }

    #[test]
    fn seek_is_rejected_while_recording() {
        let mut t = timeline();
        t.run_ticks(5).unwrap();
        assert!(!t.seek(2));
        assert_eq!(t.frame(), 5);
    }

    #[test]
    fn seek_outside_window_leaves_index_unchanged() {
        let mut t = timeline();
        t.run_ticks(5).unwrap();
        t.pause();
        assert!(t.seek(2));
        assert!(!t.seek(9));
        assert_eq!(t.frame(), 2);
        assert!(t.seek(2), "seeking to the current frame succeeds");
    }

    #[test]
    fn rewind_and_forward_move_relative_to_index() {
        let mut t = timeline();
        t.run_ticks(10).unwrap();
        t.pause();
        assert!(t.rewind(3));
        assert_eq!(t.frame(), 7);
        assert!(t.forward(2));
        assert_eq!(t.frame(), 9);
        assert!(!t.forward(5));
        assert!(!t.rewind(100));
        assert_eq!(t.frame(), 9);
    }

    #[test]
    fn resume_discards_the_future() {
        let mut t = timeline();
        t.run_ticks(10).unwrap();
        t.pause();
        t.rewind(4);
        assert!(t.resume());
        assert_eq!(t.clock().max(), Some(5));
        assert_eq!(t.tick(0.1).unwrap(), Some(6));
    }

    #[test]
    fn resume_at_live_edge_discards_nothing() {
        let mut t = timeline();
        t.run_ticks(4).unwrap();
        t.pause();
        t.resume();
        assert_eq!(t.clock().len(), 4);
        assert_eq!(t.tick(0.1).unwrap(), Some(4));
    }

    #[test]
    fn listeners_see_pause_seek_resume_in_order() {
        let mut t = timeline();
        t.run_ticks(3).unwrap();
        let events = record_events(&mut t);
        t.pause();
        t.seek(1);
        t.resume();
        assert_eq!(
            *events.borrow(),
            vec![
                TimelineEvent::Paused,
                TimelineEvent::Seeked { frame: 1 },
                TimelineEvent::Resumed { frame: 1 },
                TimelineEvent::FrameEvicted { frame: 1 },
                TimelineEvent::FrameEvicted { frame: 2 },
            ]
        );
    }

    #[test]
    fn removed_listener_is_not_called() {
        let mut t = timeline();
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        let id = t.add_listener(move |_| *counter.borrow_mut() += 1);
        t.pause();
        assert!(t.remove_listener(id));
        assert!(!t.remove_listener(id));
        t.resume();
        assert_eq!(*hits.borrow(), 1);
    }

    // -- 4. Entities --------------------------------------------------------

    #[test]
    fn attach_to_unknown_entity_fails() {
        let mut t = timeline();
        let ghost = EntityId::new(42, 0);
        let probe = TransformProbe::recorder(Some(live(Transform::default())), Space::World);
        let err = t.attach(ghost, probe).unwrap_err();
        assert!(matches!(err, RewindError::UnknownEntity { .. }));
    }

    #[test]
    fn failed_attach_does_not_register_recorder() {
        let mut t = timeline();
        let e = t.spawn("empty", false).unwrap();
        let err = t
            .attach(e, TransformProbe::recorder(None, Space::World))
            .unwrap_err();
        assert!(matches!(err, RewindError::MissingDependency { .. }));
        assert_eq!(t.object(e).unwrap().recorder_count(), 0);
        assert_eq!(t.clock().subscriber_count(), 0);
    }

    #[test]
    fn dispose_requires_lifetime_tracking() {
        let mut t = timeline();
        let plain = t.spawn("plain", false).unwrap();
        let tracked = t.spawn("tracked", true).unwrap();
        assert!(!t.dispose(plain));
        assert!(t.dispose(tracked));
        assert!(!t.dispose(tracked));
        assert_eq!(t.is_active(tracked), Some(false));
    }

    #[test]
    fn set_active_is_rejected_while_paused_or_disposed() {
        let mut t = timeline();
        let e = t.spawn("door", true).unwrap();
        assert!(t.set_active(e, false));
        assert_eq!(t.is_active(e), Some(false));

        t.pause();
        assert!(!t.set_active(e, true));
        t.resume();

        assert!(t.set_active(e, true));
        t.dispose(e);
        assert!(!t.set_active(e, true));
    }

    #[test]
    fn destroy_tears_down_without_release_hook() {
        let mut t = timeline();
        let e = t.spawn("rock", true).unwrap();
        let released = Rc::new(RefCell::new(false));
        let flag = released.clone();
        t.set_release_hook(e, move |_, _| *flag.borrow_mut() = true);
        let events = record_events(&mut t);
        t.run_ticks(3).unwrap();

        assert!(t.destroy(e));
        assert!(!t.destroy(e));
        assert!(!*released.borrow());
        assert!(t.object(e).is_none());
        assert_eq!(t.clock().subscriber_count(), 0);
        assert!(events
            .borrow()
            .contains(&TimelineEvent::Destroyed { entity: e }));
    }

    // -- 5. Session boundaries ------------------------------------------------

    #[test]
    fn reset_zeroes_index_and_rebases_spawn_frames() {
        let mut t = timeline();
        t.run_ticks(5).unwrap();
        let e = t.spawn("late", true).unwrap();
        t.run_ticks(5).unwrap();
        assert_eq!(t.object(e).unwrap().lifetime().unwrap().spawn_frame(), 5);

        t.reset();
        assert_eq!(t.frame(), 0);
        assert!(t.clock().is_empty());
        assert_eq!(t.object(e).unwrap().lifetime().unwrap().spawn_frame(), 0);
        assert_eq!(t.tick(0.1).unwrap(), Some(0));
    }

    #[test]
    fn reset_releases_pending_disposals() {
        let mut t = timeline();
        let e = t.spawn("crate", true).unwrap();
        t.run_ticks(3).unwrap();
        t.dispose(e);
        t.reset();
        assert!(t.object(e).is_none());
    }

    #[test]
    fn scene_load_resets_only_single_mode_when_enabled() {
        let mut t = timeline();
        t.run_ticks(3).unwrap();
        assert!(!t.on_scene_loaded(SceneLoadMode::Additive));
        assert_eq!(t.clock().len(), 3);
        assert!(t.on_scene_loaded(SceneLoadMode::Single));
        assert!(t.clock().is_empty());

        let mut keep = Timeline::new(TimelineConfig {
            clear_on_scene_load: false,
            ..Default::default()
        });
        keep.run_ticks(3).unwrap();
        assert!(!keep.on_scene_loaded(SceneLoadMode::Single));
        assert_eq!(keep.clock().len(), 3);
    }

    // -- 6. Configuration -----------------------------------------------------

    #[test]
    fn capacity_changes_only_affect_new_pools() {
        let mut t = timeline();
        assert!(t.set_max_record_duration(10.0));
        assert!(!t.set_max_record_duration(-1.0));
        t.set_target_fps(Some(60));
        assert_eq!(t.pools().capacity_hint(), 10 * 60 + 30);
        assert_eq!(t.clock().capacity().predicted_fps, 60);
    }
}
