//! sph2d - headless dam break demo
//!
//! Drops a block of fluid into an 800x600 box, pours in a ring of new
//! particles every two seconds and logs the fluid statistics.
//!
//! Usage: `sph2d [frames] [water|viscous|splashy]`

use std::time::Duration;

use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use sph2d::prelude::*;

const FRAME_TIME: f32 = 1.0 / 60.0;
const POUR_INTERVAL: u64 = 120;

fn main() {
    let mut args = std::env::args().skip(1);
    let frames: u64 = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(600);
    let params = match args.next().as_deref() {
        Some("viscous") => SphParams::viscous(),
        Some("splashy") => SphParams::splashy(),
        _ => SphParams::water(),
    };

    let mut app = App::new();
    app.add_plugins(LogPlugin {
        level: Level::INFO,
        filter: "sph2d=debug".to_string(),
        ..default()
    })
    .init_resource::<Time>()
    .add_plugins(SphPlugin::new(800.0, 600.0, 400).with_params(params))
    .add_systems(Update, pour.before(SphSystems));

    app.finish();
    app.cleanup();

    for _ in 0..frames {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(FRAME_TIME));
        app.update();
    }

    let state = app.world().resource::<FluidState>();
    let stats = state.simulation.stats();
    info!(
        "Done after {} frames ({:.1}s): {} particles, mean density {:.1}, {} on surface, {} non-finite",
        state.simulation.frame(),
        state.simulation.time(),
        stats.particle_count,
        stats.mean_density,
        stats.surface_particles,
        stats.non_finite,
    );
}

/// Pour a ring of particles near the top of the box at a fixed interval.
fn pour(state: Res<FluidState>, mut pending: ResMut<PendingInjections>) {
    let frame = state.simulation.frame();
    if frame > 0 && frame % POUR_INTERVAL == 0 {
        let bounds = state.simulation.bounds();
        pending.queue(bounds.center().x, bounds.height * 0.15, 20);
    }
}
