//! Animators.
//!
//! An animator has several independently recorded parts, so
//! [`AnimatorRecorder`] is a composite: at attach time it inspects the
//! animator and builds one child recorder per layer, per parameter, for the
//! root motion, and per bone. Clock events are forwarded to every child in
//! that order.
//!
//! While paused the animator itself is disabled and its speed zeroed so it
//! does not fight playback. Resume restores both.

use rewind_core::prelude::*;

use crate::host::{Animator, LayerState, Live, ParameterKind, ParameterValue, Quat, Space, Vec3};
use crate::recorders::transform::TransformProbe;

// ---------------------------------------------------------------------------
// Child probes
// ---------------------------------------------------------------------------

/// State hash and normalized time of one layer.
struct LayerProbe {
    animator: Live<Animator>,
    layer: usize,
}

impl Recordable for LayerProbe {
    type Snapshot = LayerState;

    fn read(&self, snapshot: &mut LayerState) {
        *snapshot = self
            .animator
            .borrow()
            .layers
            .get(self.layer)
            .copied()
            .unwrap_or_default();
    }

    fn apply(&mut self, snapshot: &LayerState) {
        self.animator
            .borrow_mut()
            .play(snapshot.state_hash, self.layer, snapshot.normalized_time);
    }
}

/// One parameter. The kind is fixed when the probe is built; values of
/// another kind are never read or written.
struct ParameterProbe {
    animator: Live<Animator>,
    name: String,
    kind: ParameterKind,
}

impl Recordable for ParameterProbe {
    type Snapshot = ParameterValue;

    fn read(&self, snapshot: &mut ParameterValue) {
        *snapshot = match self.animator.borrow().parameters.get(&self.name) {
            Some(value) if value.kind() == self.kind => *value,
            _ => self.kind.zero(),
        };
    }

    fn apply(&mut self, snapshot: &ParameterValue) {
        if snapshot.kind() == self.kind {
            self.animator
                .borrow_mut()
                .set_parameter(&self.name, *snapshot);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootMotionSnapshot {
    pub position: Vec3,
    pub rotation: Quat,
}

struct RootMotionProbe {
    animator: Live<Animator>,
}

impl Recordable for RootMotionProbe {
    type Snapshot = RootMotionSnapshot;

    fn read(&self, snapshot: &mut RootMotionSnapshot) {
        let animator = self.animator.borrow();
        snapshot.position = animator.root_position;
        snapshot.rotation = animator.root_rotation;
    }

    fn apply(&mut self, snapshot: &RootMotionSnapshot) {
        let mut animator = self.animator.borrow_mut();
        animator.root_position = snapshot.position;
        animator.root_rotation = snapshot.rotation;
    }
}

// ---------------------------------------------------------------------------
// AnimatorRecorder
// ---------------------------------------------------------------------------

/// Settings overridden while paused.
#[derive(Debug, Clone, Copy)]
struct Frozen {
    enabled: bool,
    speed: f32,
}

/// Composite recorder over one [`Animator`].
pub struct AnimatorRecorder {
    animator: Option<Live<Animator>>,
    attachment: Attachment,
    children: Vec<Box<dyn Recorder>>,
    frozen: Option<Frozen>,
}

impl AnimatorRecorder {
    pub fn new(animator: Option<Live<Animator>>) -> Self {
        Self {
            animator,
            attachment: Attachment::default(),
            children: Vec::new(),
            frozen: None,
        }
    }

    /// Labels of the child recorders, in forwarding order.
    pub fn child_labels(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|child| child.label())
    }

    fn build_children(animator: &Live<Animator>) -> Vec<Box<dyn Recorder>> {
        let rig = animator.borrow();
        let mut children: Vec<Box<dyn Recorder>> = Vec::new();

        for layer in 0..rig.layers.len() {
            children.push(Box::new(SnapshotRecorder::new(
                format!("animator.layer[{layer}]"),
                LayerProbe {
                    animator: animator.clone(),
                    layer,
                },
            )));
        }
        for (name, value) in &rig.parameters {
            children.push(Box::new(SnapshotRecorder::new(
                format!("animator.parameter[{name}]"),
                ParameterProbe {
                    animator: animator.clone(),
                    name: name.clone(),
                    kind: value.kind(),
                },
            )));
        }
        children.push(Box::new(SnapshotRecorder::new(
            "animator.root",
            RootMotionProbe {
                animator: animator.clone(),
            },
        )));
        for (index, bone) in rig.bones.iter().enumerate() {
            children.push(Box::new(SnapshotRecorder::new(
                format!("animator.bone[{index}]"),
                TransformProbe::new(Some(bone.clone()), Space::Local),
            )));
        }
        children
    }

    fn forward(&mut self, event: ClockEvent, ctx: &mut RecorderContext<'_>) {
        for child in &mut self.children {
            deliver(child.as_mut(), event, ctx);
        }
    }

    fn freeze(&mut self) {
        let Some(animator) = &self.animator else { return };
        let mut animator = animator.borrow_mut();
        // Keep the settings from the first pause if pause runs twice.
        if self.frozen.is_none() {
            self.frozen = Some(Frozen {
                enabled: animator.enabled,
                speed: animator.speed,
            });
        }
        animator.enabled = false;
        animator.speed = 0.0;
    }

    fn thaw(&mut self) {
        let (Some(animator), Some(frozen)) = (&self.animator, self.frozen.take()) else {
            return;
        };
        let mut animator = animator.borrow_mut();
        animator.enabled = frozen.enabled;
        animator.speed = frozen.speed;
    }
}

impl Recorder for AnimatorRecorder {
    fn label(&self) -> &str {
        "animator"
    }

    fn owner(&self) -> Option<EntityId> {
        self.attachment.owner()
    }

    fn subscription(&self) -> Option<SubscriptionId> {
        self.attachment.subscription()
    }

    fn snapshot_count(&self) -> usize {
        self.children.iter().map(|child| child.snapshot_count()).sum()
    }

    fn attach(
        &mut self,
        owner: Option<EntityId>,
        ctx: &mut RecorderContext<'_>,
    ) -> Result<(), RewindError> {
        let owner = self.attachment.check(self.label(), owner)?;
        let Some(animator) = &self.animator else {
            tracing::error!(recorder = "animator", entity = %owner, "no animator to record");
            return Err(RewindError::MissingDependency {
                recorder: "animator".into(),
                dependency: "animator".into(),
            });
        };

        let mut children = Self::build_children(animator);
        for index in 0..children.len() {
            if let Err(err) = children[index].attach(Some(owner), ctx) {
                for attached in &mut children[..index] {
                    attached.on_owner_destroyed(ctx);
                }
                return Err(err);
            }
        }
        self.children = children;
        self.attachment.bind(owner, ctx);
        tracing::debug!(entity = %owner, children = self.children.len(), "animator recorder attached");

        // Children froze themselves during their own attach.
        if ctx.is_paused() {
            self.freeze();
        }
        Ok(())
    }

    fn on_tick(&mut self, frame: Frame, delta: f64, ctx: &mut RecorderContext<'_>) {
        self.forward(ClockEvent::Tick { frame, delta }, ctx);
    }

    fn on_pause(&mut self, ctx: &mut RecorderContext<'_>) {
        self.forward(ClockEvent::Pause, ctx);
        self.freeze();
    }

    fn on_resume(&mut self, ctx: &mut RecorderContext<'_>) {
        self.forward(ClockEvent::Resume, ctx);
        self.thaw();
    }

    fn on_seek(&mut self, frame: Frame, ctx: &mut RecorderContext<'_>) {
        self.forward(ClockEvent::Seek(frame), ctx);
    }

    fn on_evict(&mut self, frame: Frame, ctx: &mut RecorderContext<'_>) {
        self.forward(ClockEvent::Evict(frame), ctx);
    }

    fn on_owner_destroyed(&mut self, ctx: &mut RecorderContext<'_>) {
        for child in &mut self.children {
            child.on_owner_destroyed(ctx);
        }
        self.attachment.detach(ctx);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
