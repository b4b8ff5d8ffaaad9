//! Projectile rewind demo.
//!
//! Fires a volley of rapier2d projectiles with seeded random velocities,
//! disposes of each one when it drops below the ground line, then scrubs
//! back through the recorded window and resumes from the middle of it.
//!
//! Run with: `cargo run --example projectile_rewind`
//! (set `RUST_LOG=rewind_engine=debug` to see lifecycle transitions).

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rewind_engine::prelude::*;

const DT: f32 = 1.0 / 60.0;
const GROUND: f32 = 0.0;
const VOLLEY: usize = 12;

struct Projectile {
    id: EntityId,
    launched_at: Frame,
}

fn main() -> Result<(), anyhow::Error> {
    init_tracing("warn");

    let config = match std::env::args().nth(1) {
        Some(path) => TimelineConfig::from_path(&path)?,
        None => TimelineConfig {
            max_record_duration: 2.0,
            target_fps: Some(60),
            ..Default::default()
        },
    };
    let mut timeline = Timeline::new(config);
    let world = live(PhysicsWorld::default());
    let mut rng = Pcg64::seed_from_u64(7);

    timeline.add_listener(|event| match event {
        TimelineEvent::Released { entity, cause } => {
            tracing::info!(entity = %entity, ?cause, "projectile released");
        }
        TimelineEvent::Despawned { entity } => {
            tracing::info!(entity = %entity, "projectile rewound out of existence");
        }
        _ => {}
    });

    // Fire one projectile every ten frames, dispose of those that land.
    let mut projectiles: Vec<Projectile> = Vec::new();
    for step in 0..240 {
        if step % 10 == 0 && projectiles.len() < VOLLEY {
            let id = timeline.spawn("projectile", true)?;
            world.borrow_mut().register_entity(
                id,
                &BodyDesc {
                    position: Vec2::new(0.0, 1.0),
                    velocity: Vec2::new(rng.gen_range(2.0..6.0), rng.gen_range(4.0..9.0)),
                    ..Default::default()
                },
            );
            timeline
                .attach(id, RigidBody2dProbe::recorder(world.clone(), id))
                .context("projectile has no physics body")?;
            let physics = world.clone();
            timeline.set_release_hook(id, move |entity, _| {
                physics.borrow_mut().unregister_entity(entity);
            });
            projectiles.push(Projectile {
                id,
                launched_at: timeline.frame(),
            });
        }

        world.borrow_mut().step(DT);
        for projectile in &projectiles {
            let landed = world
                .borrow()
                .position_of(projectile.id)
                .is_some_and(|p| p.y < GROUND);
            let disposed = timeline
                .object(projectile.id)
                .map_or(true, TimeObject::is_marked_for_disposal);
            if landed && !disposed {
                timeline.dispose(projectile.id);
            }
        }
        timeline.tick(f64::from(DT))?;
    }

    let range = timeline
        .scrub_range()
        .context("nothing was recorded")?;
    println!(
        "recorded frames {}..={} ({:.2}s retained), {} of {} projectiles still tracked",
        range.min,
        range.max,
        timeline.clock().retained_duration(),
        timeline.objects().len(),
        projectiles.len()
    );

    // Scrub back to the middle of the window.
    timeline.pause();
    let middle = range.min + (range.max - range.min) / 2;
    timeline.seek(middle);
    let visible = projectiles
        .iter()
        .filter(|p| timeline.is_active(p.id) == Some(true))
        .count();
    println!("frame {middle}: {visible} projectiles in flight");

    for projectile in projectiles.iter().filter(|p| p.launched_at > middle) {
        println!(
            "  {} (launched at frame {}) is {:?}",
            projectile.id,
            projectile.launched_at,
            timeline.lifetime_state(projectile.id)
        );
    }

    // Resuming here releases everything launched after `middle`.
    timeline.resume();
    println!(
        "resumed at frame {}: {} projectiles tracked",
        timeline.frame(),
        timeline.objects().len()
    );

    for stats in timeline.pools().stats() {
        println!(
            "  pool {}: {} created, {} available",
            stats.snapshot_type, stats.created, stats.available
        );
    }
    Ok(())
}
