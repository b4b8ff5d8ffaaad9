//! Host 3D rigid bodies.
//!
//! While paused the body is switched to kinematic so the solver leaves it
//! where playback puts it. Resuming applies the recorded state, including
//! the kinematic flag the body had at that frame.

use rewind_core::prelude::*;

use crate::host::{Body3d, Live, Quat, Transform, Vec3};

/// Where position and rotation are read from and written to.
#[derive(Debug, Clone)]
pub enum CoordinateSource {
    /// The body's own pose.
    Rigidbody,
    /// A transform the body is linked to, e.g. an interpolated visual.
    Transform(Live<Transform>),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RigidbodySnapshot {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub is_kinematic: bool,
}

#[derive(Debug)]
pub struct RigidbodyProbe {
    body: Option<Live<Body3d>>,
    source: CoordinateSource,
}

pub type RigidbodyRecorder = SnapshotRecorder<RigidbodyProbe>;

impl RigidbodyProbe {
    pub fn new(body: Option<Live<Body3d>>, source: CoordinateSource) -> Self {
        Self { body, source }
    }

    pub fn recorder(body: Option<Live<Body3d>>, source: CoordinateSource) -> RigidbodyRecorder {
        SnapshotRecorder::new("rigidbody", Self::new(body, source))
    }
}

impl Recordable for RigidbodyProbe {
    type Snapshot = RigidbodySnapshot;

    fn configure(&mut self) -> Result<(), RewindError> {
        if self.body.is_none() {
            return Err(RewindError::MissingDependency {
                recorder: "rigidbody".into(),
                dependency: "rigid body".into(),
            });
        }
        Ok(())
    }

    fn read(&self, snapshot: &mut RigidbodySnapshot) {
        let Some(body) = &self.body else { return };
        let body = body.borrow();
        (snapshot.position, snapshot.rotation) = match &self.source {
            CoordinateSource::Rigidbody => (body.position, body.rotation),
            CoordinateSource::Transform(transform) => {
                let transform = transform.borrow();
                (transform.position, transform.rotation)
            }
        };
        snapshot.velocity = body.velocity;
        snapshot.angular_velocity = body.angular_velocity;
        snapshot.is_kinematic = body.is_kinematic;
    }

    fn apply(&mut self, snapshot: &RigidbodySnapshot) {
        let Some(body) = &self.body else { return };
        let mut body = body.borrow_mut();
        body.position = snapshot.position;
        body.rotation = snapshot.rotation;
        if let CoordinateSource::Transform(transform) = &self.source {
            let mut transform = transform.borrow_mut();
            transform.position = snapshot.position;
            transform.rotation = snapshot.rotation;
        }
        body.velocity = snapshot.velocity;
        body.angular_velocity = snapshot.angular_velocity;
    }

    fn pause(&mut self) {
        if let Some(body) = &self.body {
            body.borrow_mut().is_kinematic = true;
        }
    }

    fn resume(&mut self, snapshot: &RigidbodySnapshot) {
        self.apply(snapshot);
        if let Some(body) = &self.body {
            body.borrow_mut().is_kinematic = snapshot.is_kinematic;
        }
    }
}
