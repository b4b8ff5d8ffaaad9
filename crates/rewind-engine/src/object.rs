//! Entities tracked by the timeline and the registry that owns them.
//!
//! A [`TimeObject`] is the aggregate root for one entity: its activation
//! flag, its optional [`LifetimeRecorder`], the ordered list of recorders
//! attached to it, and the strategy that runs when the timeline releases
//! it. The [`ObjectRegistry`] keeps objects in spawn order so that every
//! pass over the timeline visits them deterministically.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rewind_core::prelude::*;

use crate::lifetime::{LifetimeRecorder, LifetimeState};

// ---------------------------------------------------------------------------
// ActiveFlag
// ---------------------------------------------------------------------------

/// Shared activation flag of one entity.
///
/// Gameplay reads it to decide whether the entity takes part in the
/// simulation; playback writes it when the lifetime recorder resolves a
/// frame.
#[derive(Debug, Clone)]
pub struct ActiveFlag(Rc<Cell<bool>>);

impl ActiveFlag {
    pub fn new(active: bool) -> Self {
        Self(Rc::new(Cell::new(active)))
    }

    pub fn get(&self) -> bool {
        self.0.get()
    }

    pub fn set(&self, active: bool) {
        self.0.set(active);
    }
}

impl Default for ActiveFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

// ---------------------------------------------------------------------------
// ReleaseHook
// ---------------------------------------------------------------------------

/// Replaceable destruction strategy, e.g. returning the entity to a pool.
pub type ReleaseHook = Box<dyn FnMut(EntityId, ReleaseCause)>;

// ---------------------------------------------------------------------------
// TimeObject
// ---------------------------------------------------------------------------

/// One entity and everything recorded about it.
pub struct TimeObject {
    id: EntityId,
    name: String,
    active: ActiveFlag,
    lifetime: Option<LifetimeRecorder>,
    recorders: Vec<Box<dyn Recorder>>,
    release_hook: Option<ReleaseHook>,
}

impl TimeObject {
    pub(crate) fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: ActiveFlag::default(),
            lifetime: None,
            recorders: Vec::new(),
            release_hook: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A handle to the activation flag, for gameplay code to hold on to.
    pub fn active_flag(&self) -> ActiveFlag {
        self.active.clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn lifetime(&self) -> Option<&LifetimeRecorder> {
        self.lifetime.as_ref()
    }

    pub(crate) fn lifetime_mut(&mut self) -> Option<&mut LifetimeRecorder> {
        self.lifetime.as_mut()
    }

    /// Lifetime state at `frame`, `None` without lifetime tracking.
    pub fn lifetime_state(&self, frame: Frame) -> Option<LifetimeState> {
        self.lifetime.as_ref().map(|lifetime| lifetime.resolve(frame))
    }

    pub fn is_marked_for_disposal(&self) -> bool {
        self.lifetime
            .as_ref()
            .is_some_and(LifetimeRecorder::is_marked_for_disposal)
    }

    /// Labels of the attached recorders, in attach order.
    pub fn recorder_labels(&self) -> impl Iterator<Item = &str> {
        self.recorders.iter().map(|recorder| recorder.label())
    }

    pub fn recorder_count(&self) -> usize {
        self.recorders.len()
    }

    /// Pooled snapshots held by this object's recorders, lifetime included.
    pub fn snapshot_count(&self) -> usize {
        let lifetime = self.lifetime.as_ref().map_or(0, |l| l.snapshot_count());
        lifetime
            + self
                .recorders
                .iter()
                .map(|recorder| recorder.snapshot_count())
                .sum::<usize>()
    }

    pub fn set_release_hook(&mut self, hook: impl FnMut(EntityId, ReleaseCause) + 'static) {
        self.release_hook = Some(Box::new(hook));
    }

    pub(crate) fn set_lifetime(&mut self, lifetime: LifetimeRecorder) {
        self.lifetime = Some(lifetime);
    }

    pub(crate) fn push_recorder(&mut self, recorder: Box<dyn Recorder>) {
        self.recorders.push(recorder);
    }

    /// Fan `event` out to the lifetime recorder, then to every recorder in
    /// attach order.
    pub(crate) fn dispatch(&mut self, event: ClockEvent, ctx: &mut RecorderContext<'_>) {
        if let Some(lifetime) = self.lifetime.as_mut() {
            deliver(lifetime, event, ctx);
        }
        for recorder in &mut self.recorders {
            deliver(recorder.as_mut(), event, ctx);
        }
    }

    /// Run the release strategy. Returns `false` when none is installed.
    pub(crate) fn run_release_hook(&mut self, cause: ReleaseCause) -> bool {
        match self.release_hook.as_mut() {
            Some(hook) => {
                hook(self.id, cause);
                true
            }
            None => false,
        }
    }

    /// Detach every recorder and return all pooled snapshots.
    pub(crate) fn teardown(&mut self, ctx: &mut RecorderContext<'_>) {
        if let Some(lifetime) = self.lifetime.as_mut() {
            lifetime.on_owner_destroyed(ctx);
        }
        for recorder in &mut self.recorders {
            recorder.on_owner_destroyed(ctx);
        }
    }
}

impl fmt::Debug for TimeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.active.get())
            .field("lifetime", &self.lifetime.is_some())
            .field("recorders", &self.recorders.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ObjectRegistry
// ---------------------------------------------------------------------------

/// All live [`TimeObject`]s, in spawn order.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: IndexMap<EntityId, TimeObject>,
    allocator: EntityAllocator,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and register an empty object under it.
    pub(crate) fn create(&mut self, name: impl Into<String>) -> &mut TimeObject {
        let id = self.allocator.allocate();
        self.objects
            .entry(id)
            .or_insert_with(|| TimeObject::new(id, name))
    }

    /// Unregister an object and retire its id.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<TimeObject> {
        let object = self.objects.shift_remove(&id)?;
        self.allocator.retire(id);
        Some(object)
    }

    pub fn get(&self, id: EntityId) -> Option<&TimeObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut TimeObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Ids in spawn order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.objects.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeObject> {
        self.objects.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TimeObject> {
        self.objects.values_mut()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
