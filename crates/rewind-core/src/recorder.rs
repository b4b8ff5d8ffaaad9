//! The recorder contract.
//!
//! A recorder is one recordable property of one entity. The timeline drives
//! every attached recorder through the same five clock events:
//!
//! | event   | recorder duty                                                 |
//! |---------|---------------------------------------------------------------|
//! | tick    | capture live state into a leased snapshot keyed by frame      |
//! | pause   | capture the freeze-point state, freeze live simulation         |
//! | seek    | apply the snapshot at a frame, falling back to spawn state    |
//! | resume  | apply current/cached/spawn state, undo pause side effects     |
//! | evict   | hand the snapshot at a frame back to its pool                 |
//!
//! Most recorders only know how to read and write one kind of live value.
//! They implement [`Recordable`] and are wrapped in a [`SnapshotRecorder`],
//! which supplies the bookkeeping. Recorders that aggregate other recorders
//! implement the object-safe [`Recorder`] trait directly.

use std::collections::BTreeMap;

use crate::entity::EntityId;
use crate::event::{Outbox, ReleaseCause, TimelineEvent};
use crate::frame::{Frame, FrameCapacity, FrameClock, PlaybackState, SubscriptionId};
use crate::pool::PoolRegistry;
use crate::RewindError;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Plain data captured for one recorder at one frame.
///
/// Snapshots are pooled and reused across frames, so they carry no identity
/// and must be fully overwritten by [`Recordable::read`].
pub trait Snapshot: Default + Clone + 'static {}

impl<T: Default + Clone + 'static> Snapshot for T {}

// ---------------------------------------------------------------------------
// RecorderContext
// ---------------------------------------------------------------------------

/// Everything a recorder may touch while handling a clock event.
///
/// The context exposes the clock read-only apart from subscription
/// management, so a recorder can never move the frame index or evict frames
/// on its own.
pub struct RecorderContext<'a> {
    clock: &'a mut FrameClock,
    pools: &'a mut PoolRegistry,
    outbox: &'a mut Outbox,
    state: PlaybackState,
}

impl<'a> RecorderContext<'a> {
    pub fn new(
        clock: &'a mut FrameClock,
        pools: &'a mut PoolRegistry,
        outbox: &'a mut Outbox,
        state: PlaybackState,
    ) -> Self {
        Self {
            clock,
            pools,
            outbox,
            state,
        }
    }

    /// The clock's current frame index.
    pub fn frame(&self) -> Frame {
        self.clock.index()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn capacity(&self) -> FrameCapacity {
        self.clock.capacity()
    }

    /// Whether `frame` is inside the clock's retained window.
    pub fn is_retained(&self, frame: Frame) -> bool {
        self.clock.contains(frame)
    }

    pub fn subscribe(&mut self) -> SubscriptionId {
        self.clock.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.clock.unsubscribe(id)
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.clock.is_subscribed(id)
    }

    pub fn pools(&mut self) -> &mut PoolRegistry {
        self.pools
    }

    pub fn lease<S: Snapshot>(&mut self) -> S {
        self.pools.lease()
    }

    pub fn release<S: Snapshot>(&mut self, snapshot: S) {
        self.pools.release(snapshot);
    }

    /// Queue a notification for delivery after the current pass.
    pub fn emit(&mut self, event: TimelineEvent) {
        self.outbox.emit(event);
    }

    /// Ask the timeline to release `entity` once the current pass completes.
    pub fn request_release(&mut self, entity: EntityId, cause: ReleaseCause) {
        self.outbox.request_release(entity, cause);
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Object-safe interface the timeline drives.
///
/// Attachment is one-way: a recorder is attached once, to one owner, and
/// stays attached until its owner is destroyed.
pub trait Recorder {
    /// Human-readable name used in logs and errors.
    fn label(&self) -> &str;

    /// The owning entity, `None` before attachment.
    fn owner(&self) -> Option<EntityId>;

    /// The clock subscription, `None` before attachment and after teardown.
    fn subscription(&self) -> Option<SubscriptionId>;

    /// Number of pooled snapshots currently held, spawn and cached included.
    fn snapshot_count(&self) -> usize;

    /// Bind to `owner`, run one-time configuration, and subscribe to the
    /// clock. If the clock is paused the pause handler runs immediately.
    ///
    /// # Errors
    ///
    /// [`RewindError::InvalidOwner`] when `owner` is `None`,
    /// [`RewindError::AlreadyAttached`] on a second attach, or whatever
    /// configuration reports (typically [`RewindError::MissingDependency`]).
    /// On error the recorder is left unsubscribed.
    fn attach(
        &mut self,
        owner: Option<EntityId>,
        ctx: &mut RecorderContext<'_>,
    ) -> Result<(), RewindError>;

    fn on_tick(&mut self, frame: Frame, delta: f64, ctx: &mut RecorderContext<'_>);

    fn on_pause(&mut self, ctx: &mut RecorderContext<'_>);

    fn on_resume(&mut self, ctx: &mut RecorderContext<'_>);

    fn on_seek(&mut self, frame: Frame, ctx: &mut RecorderContext<'_>);

    fn on_evict(&mut self, frame: Frame, ctx: &mut RecorderContext<'_>);

    /// Unsubscribe and hand every held snapshot back to the pools.
    fn on_owner_destroyed(&mut self, ctx: &mut RecorderContext<'_>);
}

// ---------------------------------------------------------------------------
// ClockEvent
// ---------------------------------------------------------------------------

/// One clock notification, as fanned out by the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    Tick { frame: Frame, delta: f64 },
    Pause,
    Resume,
    Seek(Frame),
    Evict(Frame),
}

/// Forward `event` to `recorder` if it holds a live subscription.
///
/// Returns `false` when the recorder is unattached or was torn down, in
/// which case nothing is called.
pub fn deliver(
    recorder: &mut dyn Recorder,
    event: ClockEvent,
    ctx: &mut RecorderContext<'_>,
) -> bool {
    match recorder.subscription() {
        Some(id) if ctx.is_subscribed(id) => {}
        _ => return false,
    }
    match event {
        ClockEvent::Tick { frame, delta } => recorder.on_tick(frame, delta, ctx),
        ClockEvent::Pause => recorder.on_pause(ctx),
        ClockEvent::Resume => recorder.on_resume(ctx),
        ClockEvent::Seek(frame) => recorder.on_seek(frame, ctx),
        ClockEvent::Evict(frame) => recorder.on_evict(frame, ctx),
    }
    true
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// Owner binding and clock subscription shared by every recorder.
#[derive(Debug, Default)]
pub struct Attachment {
    owner: Option<EntityId>,
    subscription: Option<SubscriptionId>,
}

impl Attachment {
    /// Validate an attach request without changing anything.
    pub fn check(&self, label: &str, owner: Option<EntityId>) -> Result<EntityId, RewindError> {
        if let Some(current) = self.owner {
            return Err(RewindError::AlreadyAttached {
                recorder: label.to_owned(),
                owner: current,
            });
        }
        owner.ok_or_else(|| RewindError::InvalidOwner {
            recorder: label.to_owned(),
        })
    }

    /// Record the owner and subscribe to the clock.
    pub fn bind(&mut self, owner: EntityId, ctx: &mut RecorderContext<'_>) -> SubscriptionId {
        let id = ctx.subscribe();
        self.owner = Some(owner);
        self.subscription = Some(id);
        id
    }

    /// Drop the clock subscription. The owner binding is permanent.
    pub fn detach(&mut self, ctx: &mut RecorderContext<'_>) -> bool {
        self.subscription
            .take()
            .is_some_and(|id| ctx.unsubscribe(id))
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    pub fn is_attached(&self) -> bool {
        self.owner.is_some()
    }
}

// ---------------------------------------------------------------------------
// SnapshotHistory
// ---------------------------------------------------------------------------

/// Per-recorder mapping from frame to pooled snapshot, plus the spawn and
/// freeze-point fallbacks.
///
/// The mapping is sparse and ordered by frame. Every key lies in the
/// clock's retained window because entries are dropped on eviction.
#[derive(Debug)]
pub struct SnapshotHistory<S> {
    frames: BTreeMap<Frame, S>,
    spawn: Option<S>,
    cached: Option<S>,
}

impl<S> Default for SnapshotHistory<S> {
    fn default() -> Self {
        Self {
            frames: BTreeMap::new(),
            spawn: None,
            cached: None,
        }
    }
}

impl<S: Snapshot> SnapshotHistory<S> {

    /// Lease a snapshot, let `fill` write it, and store it at `frame`.
    /// A snapshot already stored at `frame` goes back to the pool.
    pub fn record_with(
        &mut self,
        frame: Frame,
        ctx: &mut RecorderContext<'_>,
        fill: impl FnOnce(&mut S),
    ) {
        let mut snapshot: S = ctx.lease();
        fill(&mut snapshot);
        if let Some(previous) = self.frames.insert(frame, snapshot) {
            ctx.release(previous);
        }
    }

    /// Capture the spawn-time fallback.
    pub fn set_spawn_with(&mut self, ctx: &mut RecorderContext<'_>, fill: impl FnOnce(&mut S)) {
        let mut snapshot = self.spawn.take().unwrap_or_else(|| ctx.lease());
        fill(&mut snapshot);
        self.spawn = Some(snapshot);
    }

    /// Capture the freeze-point fallback.
    pub fn cache_with(&mut self, ctx: &mut RecorderContext<'_>, fill: impl FnOnce(&mut S)) {
        let mut snapshot = self.cached.take().unwrap_or_else(|| ctx.lease());
        fill(&mut snapshot);
        self.cached = Some(snapshot);
    }

    /// Copy the seek source for `frame` into the cached slot and return it.
    ///
    /// The source is the entry at `frame`, else the spawn snapshot. After a
    /// seek the cached slot therefore mirrors what is displayed, and a resume
    /// at a frame without an entry restores exactly that.
    pub fn stage_for_seek(
        &mut self,
        frame: Frame,
        ctx: &mut RecorderContext<'_>,
        copy: fn(&S, &mut S),
    ) -> Option<&S> {
        if self.cached.is_none() {
            self.cached = Some(ctx.lease());
        }
        let source = self.frames.get(&frame).or(self.spawn.as_ref())?;
        if let Some(cached) = self.cached.as_mut() {
            copy(source, cached);
        }
        self.cached.as_ref()
    }

    pub fn get(&self, frame: Frame) -> Option<&S> {
        self.frames.get(&frame)
    }

    pub fn spawn(&self) -> Option<&S> {
        self.spawn.as_ref()
    }

    pub fn cached(&self) -> Option<&S> {
        self.cached.as_ref()
    }

    /// Entry at `frame`, else the spawn snapshot.
    pub fn seek_source(&self, frame: Frame) -> Option<&S> {
        self.frames.get(&frame).or(self.spawn.as_ref())
    }

    /// Entry at `frame`, else the cached snapshot, else the spawn snapshot.
    pub fn resume_source(&self, frame: Frame) -> Option<&S> {
        self.frames
            .get(&frame)
            .or(self.cached.as_ref())
            .or(self.spawn.as_ref())
    }

    /// The newest entry at or before `frame`.
    pub fn latest_at_or_before(&self, frame: Frame) -> Option<(Frame, &S)> {
        self.frames
            .range(..=frame)
            .next_back()
            .map(|(&at, snapshot)| (at, snapshot))
    }

    /// Return the entry at `frame` to the pool. `false` if there was none.
    pub fn evict(&mut self, frame: Frame, ctx: &mut RecorderContext<'_>) -> bool {
        match self.frames.remove(&frame) {
            Some(snapshot) => {
                ctx.release(snapshot);
                true
            }
            None => false,
        }
    }

    /// Return every held snapshot to the pool, fallbacks included.
    pub fn release_all(&mut self, ctx: &mut RecorderContext<'_>) {
        for snapshot in std::mem::take(&mut self.frames).into_values() {
            ctx.release(snapshot);
        }
        if let Some(snapshot) = self.spawn.take() {
            ctx.release(snapshot);
        }
        if let Some(snapshot) = self.cached.take() {
            ctx.release(snapshot);
        }
    }

    /// Recorded frames in increasing order.
    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        self.frames.keys().copied()
    }

    /// Number of frame entries, fallbacks excluded.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of pooled snapshots held, fallbacks included.
    pub fn held(&self) -> usize {
        self.frames.len() + self.spawn.is_some() as usize + self.cached.is_some() as usize
    }
}

// ---------------------------------------------------------------------------
// Recordable
// ---------------------------------------------------------------------------

/// Read/apply access to one kind of live value.
///
/// Implementors supply `read` and `apply`; the hooks have defaults that
/// suit values without pause-time side effects.
pub trait Recordable {
    type Snapshot: Snapshot;

    /// One-time setup at attach, e.g. locating the live object.
    fn configure(&mut self) -> Result<(), RewindError> {
        Ok(())
    }

    /// Write the live state into `snapshot`. Must not mutate live state.
    fn read(&self, snapshot: &mut Self::Snapshot);

    /// Overwrite the live state from `snapshot`.
    fn apply(&mut self, snapshot: &Self::Snapshot);

    fn copy(source: &Self::Snapshot, target: &mut Self::Snapshot) {
        target.clone_from(source);
    }

    /// Freeze live simulation. Must be exactly undone by [`resume`](Self::resume).
    fn pause(&mut self) {}

    /// Apply `snapshot` and undo whatever [`pause`](Self::pause) did.
    fn resume(&mut self, snapshot: &Self::Snapshot) {
        self.apply(snapshot);
    }

    /// Apply `snapshot` as the state displayed at `frame`.
    fn apply_frame(&mut self, frame: Frame, snapshot: &Self::Snapshot) {
        let _ = frame;
        self.apply(snapshot);
    }
}

// ---------------------------------------------------------------------------
// SnapshotRecorder
// ---------------------------------------------------------------------------

/// The standard recorder: a [`Recordable`] plus its snapshot history.
pub struct SnapshotRecorder<R: Recordable> {
    label: String,
    probe: R,
    attachment: Attachment,
    history: SnapshotHistory<R::Snapshot>,
}

impl<R: Recordable> SnapshotRecorder<R> {
    pub fn new(label: impl Into<String>, probe: R) -> Self {
        Self {
            label: label.into(),
            probe,
            attachment: Attachment::default(),
            history: SnapshotHistory::default(),
        }
    }

    pub fn probe(&self) -> &R {
        &self.probe
    }

    pub fn probe_mut(&mut self) -> &mut R {
        &mut self.probe
    }

    pub fn history(&self) -> &SnapshotHistory<R::Snapshot> {
        &self.history
    }

    /// Capture the current live state, as `on_tick` would.
    pub fn capture(&self) -> R::Snapshot {
        let mut snapshot = R::Snapshot::default();
        self.probe.read(&mut snapshot);
        snapshot
    }
}

impl<R: Recordable> Recorder for SnapshotRecorder<R> {
    fn label(&self) -> &str {
        &self.label
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
        let owner = self.attachment.check(&self.label, owner)?;
        if let Err(err) = self.probe.configure() {
            tracing::error!(recorder = %self.label, entity = %owner, error = %err, "recorder configuration failed");
            return Err(err);
        }

        self.history = SnapshotHistory::default();
        self.attachment.bind(owner, ctx);
        let probe = &self.probe;
        self.history.set_spawn_with(ctx, |s| probe.read(s));
        tracing::debug!(recorder = %self.label, entity = %owner, frame = ctx.frame(), "recorder attached");

        if ctx.is_paused() {
            self.on_pause(ctx);
        }
        Ok(())
    }

    fn on_tick(&mut self, frame: Frame, _delta: f64, ctx: &mut RecorderContext<'_>) {
        let probe = &self.probe;
        self.history.record_with(frame, ctx, |s| probe.read(s));
    }

    fn on_pause(&mut self, ctx: &mut RecorderContext<'_>) {
        let probe = &self.probe;
        self.history.cache_with(ctx, |s| probe.read(s));
        self.probe.pause();
    }

    fn on_resume(&mut self, ctx: &mut RecorderContext<'_>) {
        if let Some(snapshot) = self.history.resume_source(ctx.frame()) {
            self.probe.resume(snapshot);
        }
    }

    fn on_seek(&mut self, frame: Frame, ctx: &mut RecorderContext<'_>) {
        if let Some(snapshot) = self.history.stage_for_seek(frame, ctx, R::copy) {
            self.probe.apply_frame(frame, snapshot);
        }
    }

    fn on_evict(&mut self, frame: Frame, ctx: &mut RecorderContext<'_>) {
        self.history.evict(frame, ctx);
    }

    fn on_owner_destroyed(&mut self, ctx: &mut RecorderContext<'_>) {
        self.attachment.detach(ctx);
        self.history.release_all(ctx);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
