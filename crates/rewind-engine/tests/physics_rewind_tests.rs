//! rapier2d bodies under the timeline.
//!
//! A projectile is simulated by rapier while the timeline records it. After
//! scrubbing back and resuming, stepping the world again must retrace the
//! original trajectory.

use rewind_engine::prelude::*;

const DT: f32 = 1.0 / 60.0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Scene {
    timeline: Timeline,
    world: Live<PhysicsWorld>,
    ball: EntityId,
}

fn launch() -> Scene {
    let mut timeline = Timeline::default();
    let world = live(PhysicsWorld::default());
    let ball = timeline.spawn("ball", true).unwrap();
    world.borrow_mut().register_entity(
        ball,
        &BodyDesc {
            position: Vec2::new(0.0, 20.0),
            velocity: Vec2::new(3.0, 4.0),
            ..Default::default()
        },
    );
    timeline
        .attach(ball, RigidBody2dProbe::recorder(world.clone(), ball))
        .unwrap();
    Scene {
        timeline,
        world,
        ball,
    }
}

impl Scene {
    /// Step physics, then record the post-step state.
    fn step(&mut self) -> Vec2 {
        self.world.borrow_mut().step(DT);
        self.timeline.tick(DT as f64).unwrap();
        self.position()
    }

    fn position(&self) -> Vec2 {
        self.world.borrow().position_of(self.ball).unwrap()
    }
}

fn assert_close(a: Vec2, b: Vec2) {
    assert!(
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4,
        "{a:?} != {b:?}"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn seek_restores_recorded_body_pose() {
    let mut scene = launch();
    let trajectory: Vec<Vec2> = (0..60).map(|_| scene.step()).collect();

    scene.timeline.pause();
    assert!(scene.timeline.seek(20));
    assert_eq!(scene.position(), trajectory[20]);

    assert!(scene.timeline.seek(59));
    assert_eq!(scene.position(), trajectory[59]);
}

#[test]
fn paused_body_ignores_simulation_steps() {
    let mut scene = launch();
    for _ in 0..10 {
        scene.step();
    }
    scene.timeline.pause();
    let handle = scene.world.borrow().handle_of(scene.ball).unwrap();
    assert!(scene.world.borrow().body(handle).unwrap().is_kinematic());

    scene.timeline.resume();
    assert!(scene.world.borrow().body(handle).unwrap().is_dynamic());
}

#[test]
fn resumed_simulation_retraces_the_trajectory() {
    let mut scene = launch();
    let trajectory: Vec<Vec2> = (0..60).map(|_| scene.step()).collect();

    scene.timeline.pause();
    scene.timeline.seek(20);
    assert!(scene.timeline.resume());

    // The body now holds exactly the state recorded at frame 20.
    assert_eq!(scene.position(), trajectory[20]);
    for expected in &trajectory[21..40] {
        assert_close(scene.step(), *expected);
    }
}

#[test]
fn spinning_body_rotation_is_restored_bit_for_bit() {
    let mut scene = launch();
    let handle = scene.world.borrow().handle_of(scene.ball).unwrap();
    scene
        .world
        .borrow_mut()
        .body_mut(handle)
        .unwrap()
        .set_angvel(2.3, true);

    let rotations: Vec<_> = (0..45)
        .map(|_| {
            scene.step();
            *scene.world.borrow().body(handle).unwrap().rotation()
        })
        .collect();

    scene.timeline.pause();
    for frame in [3, 17, 44, 0] {
        assert!(scene.timeline.seek(frame));
        let world = scene.world.borrow();
        assert_eq!(*world.body(handle).unwrap().rotation(), rotations[frame as usize]);
    }
}

#[test]
fn unregistered_body_cannot_be_recorded() {
    let mut timeline = Timeline::default();
    let world = live(PhysicsWorld::default());
    let ghost = timeline.spawn("ghost", false).unwrap();
    let err = timeline
        .attach(ghost, RigidBody2dProbe::recorder(world, ghost))
        .unwrap_err();
    assert!(matches!(err, RewindError::MissingDependency { .. }));
}
