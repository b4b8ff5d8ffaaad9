//! Particle emitters.
//!
//! Only the emitter clock and play state are recorded. Individual particles
//! are not, so a rewound emitter replays whatever its own simulation
//! produces from the restored clock.

use rewind_core::prelude::*;

use crate::host::{Live, ParticlePlayState, ParticleSystem};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParticleSnapshot {
    pub time: f32,
    pub state: ParticlePlayState,
}

#[derive(Debug)]
pub struct ParticleProbe {
    system: Option<Live<ParticleSystem>>,
}

pub type ParticleRecorder = SnapshotRecorder<ParticleProbe>;

impl ParticleProbe {
    pub fn new(system: Option<Live<ParticleSystem>>) -> Self {
        Self { system }
    }

    pub fn recorder(system: Option<Live<ParticleSystem>>) -> ParticleRecorder {
        SnapshotRecorder::new("particles", Self::new(system))
    }
}

impl Recordable for ParticleProbe {
    type Snapshot = ParticleSnapshot;

    fn configure(&mut self) -> Result<(), RewindError> {
        if self.system.is_none() {
            return Err(RewindError::MissingDependency {
                recorder: "particles".into(),
                dependency: "particle system".into(),
            });
        }
        Ok(())
    }

    fn read(&self, snapshot: &mut ParticleSnapshot) {
        if let Some(system) = &self.system {
            let system = system.borrow();
            snapshot.time = system.time;
            snapshot.state = system.state;
        }
    }

    /// Restores the clock only; the play state stays frozen until resume.
    fn apply(&mut self, snapshot: &ParticleSnapshot) {
        if let Some(system) = &self.system {
            system.borrow_mut().time = snapshot.time;
        }
    }

    fn pause(&mut self) {
        if let Some(system) = &self.system {
            system.borrow_mut().pause();
        }
    }

    fn resume(&mut self, snapshot: &ParticleSnapshot) {
        self.apply(snapshot);
        if let Some(system) = &self.system {
            let mut system = system.borrow_mut();
            match snapshot.state {
                ParticlePlayState::Playing => system.play(),
                ParticlePlayState::Paused => system.pause(),
                ParticlePlayState::Stopped => system.stop(),
            }
        }
    }
}
