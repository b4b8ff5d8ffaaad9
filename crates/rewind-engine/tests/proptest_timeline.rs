//! Property tests for the timeline.
//!
//! Random sequences of ticks, pauses, seeks, resumes, spawns and destroys
//! are applied to a timeline whose entities each carry one transform
//! recorder. After every step the window must respect the retention budget,
//! the frame index must be where the playback state says it is, and every
//! pooled transform snapshot must be accounted for.

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rewind_engine::prelude::*;
use rewind_engine::recorders::transform::TransformSnapshot;

const BUDGET: f64 = 0.5;

#[derive(Debug, Clone)]
enum Op {
    /// Record one frame with a delta in milliseconds.
    Tick(u32),
    Pause,
    Resume,
    /// Seek this many frames before the newest retained frame.
    Seek(u64),
    Spawn,
    /// Destroy the n-th live entity, modulo the entity count.
    Destroy(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        8 => (1u32..60).prop_map(Op::Tick),
        1 => Just(Op::Pause),
        1 => Just(Op::Resume),
        2 => (0u64..40).prop_map(Op::Seek),
        1 => Just(Op::Spawn),
        1 => (0usize..8).prop_map(Op::Destroy),
    ]
}

struct Rig {
    timeline: Timeline,
    transforms: Vec<(EntityId, Live<Transform>)>,
    step: u32,
}

impl Rig {
    fn new() -> Self {
        let timeline = Timeline::new(TimelineConfig {
            max_record_duration: BUDGET,
            ..Default::default()
        });
        Self {
            timeline,
            transforms: Vec::new(),
            step: 0,
        }
    }

    fn spawn(&mut self) {
        let transform = live(Transform::default());
        let id = self.timeline.spawn("body", false).unwrap();
        self.timeline
            .attach(id, TransformProbe::recorder(Some(transform.clone()), Space::World))
            .unwrap();
        self.transforms.push((id, transform));
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Tick(ms) => {
                self.step += 1;
                for (_, transform) in &self.transforms {
                    transform.borrow_mut().position.x = self.step as f32;
                }
                self.timeline.tick(f64::from(ms) / 1000.0).unwrap();
            }
            Op::Pause => {
                self.timeline.pause();
            }
            Op::Resume => {
                self.timeline.resume();
            }
            Op::Seek(back) => {
                if let Some(max) = self.timeline.clock().max() {
                    self.timeline.seek(max.saturating_sub(back));
                }
            }
            Op::Spawn => self.spawn(),
            Op::Destroy(n) => {
                if !self.transforms.is_empty() {
                    let (id, _) = self.transforms.remove(n % self.transforms.len());
                    assert!(self.timeline.destroy(id));
                }
            }
        }
    }

    fn check(&self, last: &Op) {
        let clock = self.timeline.clock();

        if let Op::Tick(ms) = last {
            if !self.timeline.is_paused() {
                let bound = BUDGET + f64::from(*ms) / 1000.0 + 1e-9;
                assert!(clock.retained_duration() <= bound);
            }
        }

        match (self.timeline.is_paused(), clock.min(), clock.max()) {
            (false, _, Some(max)) => assert!(self.timeline.frame() > max),
            (true, Some(min), Some(max)) => {
                let frame = self.timeline.frame();
                assert!(min <= frame && frame <= max + 1);
            }
            _ => {}
        }

        let held: usize = self
            .timeline
            .objects()
            .iter()
            .map(TimeObject::snapshot_count)
            .sum();
        let (created, available) = self
            .timeline
            .pools()
            .pool::<TransformSnapshot>()
            .map_or((0, 0), |pool| (pool.created(), pool.available()));
        assert_eq!(created, available + held);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn timeline_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut rig = Rig::new();
        rig.spawn();
        for op in &ops {
            rig.apply(op);
            rig.check(op);
        }
    }

    #[test]
    fn seek_out_of_window_leaves_index(ticks in 1usize..50, offset in 1u64..20) {
        let mut rig = Rig::new();
        rig.spawn();
        for _ in 0..ticks {
            rig.apply(&Op::Tick(16));
        }
        rig.timeline.pause();
        let before = rig.timeline.frame();
        let max = rig.timeline.clock().max().unwrap();
        prop_assert!(!rig.timeline.seek(max + offset));
        prop_assert_eq!(rig.timeline.frame(), before);
        prop_assert!(rig.timeline.seek(before));
    }

    #[test]
    fn seek_shows_the_value_recorded_at_that_frame(ticks in 2usize..30, pick in 0usize..30) {
        let mut rig = Rig::new();
        rig.spawn();
        for _ in 0..ticks {
            rig.apply(&Op::Tick(10));
        }
        rig.timeline.pause();
        let frame = (pick % ticks) as u64;
        prop_assert!(rig.timeline.seek(frame));
        // Tick n recorded step n + 1.
        let (_, transform) = &rig.transforms[0];
        prop_assert_eq!(transform.borrow().position.x, (frame + 1) as f32);
    }
}

/// Long seeded churn: the pools stop growing once the window is full.
#[test]
fn seeded_churn_reaches_steady_pool_size() {
    let mut rng = Pcg64::seed_from_u64(0x5EED);
    let mut rig = Rig::new();
    for _ in 0..4 {
        rig.spawn();
    }

    for _ in 0..200 {
        rig.apply(&Op::Tick(rng.gen_range(5..20)));
    }
    let warmed = rig
        .timeline
        .pools()
        .pool::<TransformSnapshot>()
        .map_or(0, |pool| pool.created());

    for _ in 0..2_000 {
        let op = match rng.gen_range(0..20) {
            0 => Op::Pause,
            1 => Op::Resume,
            2 => Op::Seek(rng.gen_range(0..30)),
            _ => Op::Tick(rng.gen_range(5..20)),
        };
        rig.apply(&op);
        rig.check(&op);
    }
    rig.timeline.resume();

    let after = rig
        .timeline
        .pools()
        .pool::<TransformSnapshot>()
        .map_or(0, |pool| pool.created());
    // Shorter deltas can hold up to 100 frames per entity plus cached slots.
    assert!(after <= 4 * (BUDGET / 0.005) as usize + 4 * 2 + 4);
    assert!(after >= warmed);
}
