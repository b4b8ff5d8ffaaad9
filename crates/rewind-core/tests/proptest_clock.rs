//! Property tests for the frame clock and the snapshot recorder.
//!
//! Random sequences of ticks, range clears and budget changes are applied to
//! a clock with one recorder attached. After every step the recorder's frame
//! entries must lie inside the retained window and every pooled snapshot must
//! be accounted for.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rewind_core::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
struct Sample(u64);

struct CounterProbe {
    value: Rc<Cell<u64>>,
}

impl Recordable for CounterProbe {
    type Snapshot = Sample;

    fn read(&self, snapshot: &mut Sample) {
        snapshot.0 = self.value.get();
    }

    fn apply(&mut self, snapshot: &Sample) {
        self.value.set(snapshot.0);
    }
}

#[derive(Debug, Clone)]
enum ClockOp {
    /// Record one frame with a delta in milliseconds.
    Tick(u32),
    /// Discard the newest `n` frames.
    Truncate(usize),
    /// Shrink or grow the retention budget (milliseconds).
    Budget(u32),
}

fn clock_op_strategy() -> impl Strategy<Value = ClockOp> {
    prop_oneof![
        6 => (1u32..100).prop_map(ClockOp::Tick),
        1 => (0usize..10).prop_map(ClockOp::Truncate),
        1 => (50u32..2_000).prop_map(ClockOp::Budget),
    ]
}

struct Rig {
    clock: FrameClock,
    pools: PoolRegistry,
    outbox: Outbox,
    recorder: SnapshotRecorder<CounterProbe>,
    value: Rc<Cell<u64>>,
}

impl Rig {
    fn new() -> Self {
        let clock = FrameClock::new(FrameCapacity::default());
        let pools = PoolRegistry::new(clock.capacity().prediction());
        let value = Rc::new(Cell::new(0));
        let mut rig = Self {
            clock,
            pools,
            outbox: Outbox::default(),
            recorder: SnapshotRecorder::new(
                "counter",
                CounterProbe {
                    value: value.clone(),
                },
            ),
            value,
        };
        let mut ctx = RecorderContext::new(
            &mut rig.clock,
            &mut rig.pools,
            &mut rig.outbox,
            PlaybackState::Recording,
        );
        rig.recorder
            .attach(Some(EntityId::new(0, 0)), &mut ctx)
            .expect("attach succeeds");
        rig
    }

    fn tick(&mut self, delta: f64, budget: f64) {
        let frame = self.clock.index();
        self.clock.register_frame(delta).expect("single registration");
        let mut evicted = Vec::new();
        self.clock.fit_to_budget(budget, |f| evicted.push(f));
        let mut ctx = RecorderContext::new(
            &mut self.clock,
            &mut self.pools,
            &mut self.outbox,
            PlaybackState::Recording,
        );
        for f in evicted {
            deliver(&mut self.recorder, ClockEvent::Evict(f), &mut ctx);
        }
        self.value.set(frame * 10);
        deliver(&mut self.recorder, ClockEvent::Tick { frame, delta }, &mut ctx);
        self.clock.advance();
    }

    fn truncate(&mut self, n: usize) {
        let Some(max) = self.clock.max() else {
            return;
        };
        let start = (max + 1).saturating_sub(n as u64);
        let mut evicted = Vec::new();
        self.clock.clear_from(start, |f| evicted.push(f));
        let mut ctx = RecorderContext::new(
            &mut self.clock,
            &mut self.pools,
            &mut self.outbox,
            PlaybackState::Recording,
        );
        for f in evicted {
            deliver(&mut self.recorder, ClockEvent::Evict(f), &mut ctx);
        }
    }

    fn assert_invariants(&self, budget: Option<f64>, largest_delta: f64) {
        for frame in self.recorder.history().frames() {
            assert!(
                self.clock.contains(frame),
                "recorder holds frame {frame} outside the retained window"
            );
        }
        if let Some(budget) = budget {
            assert!(self.clock.retained_duration() <= budget + largest_delta + 1e-9);
        }

        let stats = self.pools.stats();
        let sample = stats
            .iter()
            .find(|s| s.snapshot_type.ends_with("Sample"))
            .expect("sample pool exists");
        assert_eq!(
            sample.created,
            sample.available + self.recorder.snapshot_count(),
            "every pooled snapshot is either free or held"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn random_clock_ops_keep_recorder_inside_window(
        ops in prop::collection::vec(clock_op_strategy(), 1..120)
    ) {
        let mut rig = Rig::new();
        let mut budget = 1.0;
        let mut largest_delta: f64 = 0.0;

        for op in ops {
            // The duration bound is only promised right after a tick fits
            // the window to the budget.
            let fitted = match op {
                ClockOp::Tick(ms) => {
                    let delta = ms as f64 / 1000.0;
                    largest_delta = largest_delta.max(delta);
                    rig.tick(delta, budget);
                    Some(budget)
                }
                ClockOp::Truncate(n) => {
                    rig.truncate(n);
                    None
                }
                ClockOp::Budget(ms) => {
                    budget = ms as f64 / 1000.0;
                    None
                }
            };
            if rig.clock.is_empty() {
                continue;
            }
            rig.assert_invariants(fitted, largest_delta);
        }
    }

    #[test]
    fn seek_restores_the_value_recorded_at_that_frame(
        ticks in 2u64..60,
        pick in any::<prop::sample::Index>(),
    ) {
        let mut rig = Rig::new();
        for _ in 0..ticks {
            rig.tick(1.0 / 60.0, 30.0);
        }
        let target = pick.index(ticks as usize) as u64;
        let mut ctx = RecorderContext::new(
            &mut rig.clock,
            &mut rig.pools,
            &mut rig.outbox,
            PlaybackState::Paused,
        );
        deliver(&mut rig.recorder, ClockEvent::Seek(target), &mut ctx);
        prop_assert_eq!(rig.value.get(), target * 10);
    }
}

#[test]
fn seeded_churn_reuses_pooled_snapshots() {
    let mut rng = Pcg64::seed_from_u64(0x5eed);
    let mut rig = Rig::new();

    // Warm up to a steady window of about 60 frames.
    for _ in 0..120 {
        rig.tick(1.0 / 60.0, 1.0);
    }
    let warmed = rig
        .pools
        .stats()
        .into_iter()
        .find(|s| s.snapshot_type.ends_with("Sample"))
        .expect("sample pool exists")
        .created;

    for _ in 0..2_000 {
        let jitter = rng.gen_range(-0.001..0.001);
        rig.tick(1.0 / 60.0 + jitter, 1.0);
    }
    let after = rig
        .pools
        .stats()
        .into_iter()
        .find(|s| s.snapshot_type.ends_with("Sample"))
        .expect("sample pool exists")
        .created;

    // Jitter can grow the window by a couple of frames, never by hundreds.
    assert!(after <= warmed + 16, "pool kept allocating: {warmed} -> {after}");
}
