//! Trail renderers.

use rewind_core::prelude::*;

use crate::host::{Live, Trail, Vec3};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrailSnapshot {
    pub time: f32,
    pub emitting: bool,
    /// Reused across leases; cleared and refilled on every read.
    pub positions: Vec<Vec3>,
}

#[derive(Debug)]
pub struct TrailProbe {
    trail: Option<Live<Trail>>,
}

pub type TrailRecorder = SnapshotRecorder<TrailProbe>;

impl TrailProbe {
    pub fn new(trail: Option<Live<Trail>>) -> Self {
        Self { trail }
    }

    pub fn recorder(trail: Option<Live<Trail>>) -> TrailRecorder {
        SnapshotRecorder::new("trail", Self::new(trail))
    }
}

impl Recordable for TrailProbe {
    type Snapshot = TrailSnapshot;

    fn configure(&mut self) -> Result<(), RewindError> {
        if self.trail.is_none() {
            return Err(RewindError::MissingDependency {
                recorder: "trail".into(),
                dependency: "trail".into(),
            });
        }
        Ok(())
    }

    fn read(&self, snapshot: &mut TrailSnapshot) {
        if let Some(trail) = &self.trail {
            let trail = trail.borrow();
            snapshot.time = trail.time;
            snapshot.emitting = trail.emitting;
            snapshot.positions.clear();
            snapshot.positions.extend_from_slice(&trail.positions);
        }
    }

    fn apply(&mut self, snapshot: &TrailSnapshot) {
        if let Some(trail) = &self.trail {
            let mut trail = trail.borrow_mut();
            trail.time = snapshot.time;
            trail.emitting = snapshot.emitting;
            trail.positions.clear();
            trail.positions.extend_from_slice(&snapshot.positions);
        }
    }

    /// Freeze the trail: points never expire and no new ones are added.
    fn pause(&mut self) {
        if let Some(trail) = &self.trail {
            let mut trail = trail.borrow_mut();
            trail.time = f32::INFINITY;
            trail.emitting = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::live;
    use crate::recorders::assert_round_trip;

    #[test]
    fn pause_freezes_and_resume_restores_settings() {
        let trail = live(Trail::default());
        trail.borrow_mut().add_position(Vec3::new(1.0, 0.0, 0.0));
        let mut probe = TrailProbe::new(Some(trail.clone()));
        let mut snapshot = TrailSnapshot::default();
        probe.read(&mut snapshot);

        probe.pause();
        trail.borrow_mut().add_position(Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(trail.borrow().positions.len(), 1);
        assert!(trail.borrow().time.is_infinite());

        probe.resume(&snapshot);
        assert_eq!(trail.borrow().time, 1.0);
        assert!(trail.borrow().emitting);
    }

    #[test]
    fn reused_snapshot_drops_stale_positions() {
        let trail = live(Trail::default());
        let probe = TrailProbe::new(Some(trail.clone()));
        let mut snapshot = TrailSnapshot {
            positions: vec![Vec3::new(9.0, 9.0, 9.0); 4],
            ..Default::default()
        };
        trail.borrow_mut().add_position(Vec3::ZERO);
        probe.read(&mut snapshot);
        assert_eq!(snapshot.positions, vec![Vec3::ZERO]);
    }

    #[test]
    fn read_apply_read_is_exact() {
        let trail = live(Trail {
            time: 0.35,
            emitting: false,
            positions: vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-0.1, 0.0, 1.0e-7)],
        });
        let snapshot = assert_round_trip(&mut TrailProbe::new(Some(trail)));
        assert_eq!(snapshot.positions.len(), 2);
        assert!(!snapshot.emitting);
    }
}
