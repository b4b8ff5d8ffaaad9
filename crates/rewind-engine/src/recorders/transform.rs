//! Position and rotation of a [`Transform`].

use rewind_core::prelude::*;

use crate::host::{Live, Quat, Space, Transform, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformSnapshot {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Reads and writes one transform in world or local space.
#[derive(Debug)]
pub struct TransformProbe {
    transform: Option<Live<Transform>>,
    space: Space,
}

pub type TransformRecorder = SnapshotRecorder<TransformProbe>;

impl TransformProbe {
    pub fn new(transform: Option<Live<Transform>>, space: Space) -> Self {
        Self { transform, space }
    }

    /// A ready-to-attach recorder for `transform`.
    pub fn recorder(transform: Option<Live<Transform>>, space: Space) -> TransformRecorder {
        SnapshotRecorder::new("transform", Self::new(transform, space))
    }

    pub fn space(&self) -> Space {
        self.space
    }
}

impl Recordable for TransformProbe {
    type Snapshot = TransformSnapshot;

    fn configure(&mut self) -> Result<(), RewindError> {
        if self.transform.is_none() {
            return Err(RewindError::MissingDependency {
                recorder: "transform".into(),
                dependency: "transform".into(),
            });
        }
        Ok(())
    }

    fn read(&self, snapshot: &mut TransformSnapshot) {
        if let Some(transform) = &self.transform {
            let (position, rotation) = transform.borrow().coordinates(self.space);
            snapshot.position = position;
            snapshot.rotation = rotation;
        }
    }

    fn apply(&mut self, snapshot: &TransformSnapshot) {
        if let Some(transform) = &self.transform {
            transform
                .borrow_mut()
                .set_coordinates(self.space, snapshot.position, snapshot.rotation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::live;

    #[test]
    fn local_space_leaves_world_coordinates_alone() {
        let transform = live(Transform::at(Vec3::new(1.0, 2.0, 3.0)));
        let mut probe = TransformProbe::new(Some(transform.clone()), Space::Local);
        let mut snapshot = TransformSnapshot::default();
        probe.read(&mut snapshot);
        assert_eq!(snapshot.position, Vec3::new(1.0, 2.0, 3.0));

        transform.borrow_mut().position = Vec3::new(9.0, 9.0, 9.0);
        snapshot.position = Vec3::ZERO;
        probe.apply(&snapshot);
        assert_eq!(transform.borrow().local_position, Vec3::ZERO);
        assert_eq!(transform.borrow().position, Vec3::new(9.0, 9.0, 9.0));
    }

    #[test]
    fn read_then_apply_is_a_no_op() {
        let transform = live(Transform {
            position: Vec3::new(4.0, 5.0, 6.0),
            rotation: Quat::from_rotation_z(0.5),
            ..Default::default()
        });
        let mut probe = TransformProbe::new(Some(transform.clone()), Space::World);
        let before = *transform.borrow();
        let mut snapshot = TransformSnapshot::default();
        probe.read(&mut snapshot);
        probe.apply(&snapshot);
        assert_eq!(*transform.borrow(), before);
    }

    #[test]
    fn missing_transform_fails_configuration() {
        let mut probe = TransformProbe::new(None, Space::World);
        assert!(matches!(
            probe.configure(),
            Err(RewindError::MissingDependency { .. })
        ));
    }
}
