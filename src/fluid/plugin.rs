//! Bevy plugin for the SPH fluid.

use bevy::prelude::*;

use super::params::SphParams;
use super::simulation::{Simulation, SimulationStats};

/// Plugin that adds a 2D SPH fluid to a Bevy app.
///
/// # Example
///
/// ```rust,ignore
/// use bevy::prelude::*;
/// use sph2d::prelude::*;
///
/// fn main() {
///     App::new()
///         .add_plugins(MinimalPlugins)
///         .add_plugins(SphPlugin::new(800.0, 600.0, 400))
///         .run();
/// }
/// ```
///
/// An [`SphParams`] resource inserted before the plugin takes precedence over
/// [`SphPlugin::params`].
#[derive(Clone, Debug)]
pub struct SphPlugin {
    pub width: f32,
    pub height: f32,
    pub particle_count: usize,
    pub params: SphParams,
}

impl Default for SphPlugin {
    fn default() -> Self {
        Self::new(800.0, 600.0, 400)
    }
}

impl SphPlugin {
    pub fn new(width: f32, height: f32, particle_count: usize) -> Self {
        Self {
            width,
            height,
            particle_count,
            params: SphParams::default(),
        }
    }

    pub fn with_params(mut self, params: SphParams) -> Self {
        self.params = params;
        self
    }
}

impl Plugin for SphPlugin {
    fn build(&self, app: &mut App) {
        let params = app
            .world()
            .get_resource::<SphParams>()
            .cloned()
            .unwrap_or_else(|| self.params.clone());
        let simulation = Simulation::from_params(self.width, self.height, self.particle_count, params.clone());

        app.insert_resource(params)
            .insert_resource(FluidState::new(simulation))
            .init_resource::<PendingInjections>();

        app.add_systems(
            Update,
            (sync_params, apply_injections, run_simulation, report_stats)
                .chain()
                .in_set(SphSystems),
        );
    }
}

/// System set containing every fluid system, in pipeline order.
#[derive(SystemSet, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SphSystems;

/// The running simulation and its playback controls.
#[derive(Resource)]
pub struct FluidState {
    pub simulation: Simulation,
    pub paused: bool,
    /// Advance exactly one frame while paused.
    pub step_requested: bool,
    /// Frames between stats reports. Zero disables reporting.
    pub stats_interval: u64,
    /// Stats from the last report.
    pub last_stats: SimulationStats,
    last_report_frame: u64,
}

impl FluidState {
    pub fn new(simulation: Simulation) -> Self {
        Self {
            simulation,
            paused: false,
            step_requested: false,
            stats_interval: 60,
            last_stats: SimulationStats::default(),
            last_report_frame: 0,
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        info!("Fluid simulation {}", if self.paused { "paused" } else { "resumed" });
    }

    pub fn request_step(&mut self) {
        self.step_requested = true;
    }
}

/// A ring of particles waiting to be added to the simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Injection {
    pub position: Vec2,
    pub count: usize,
}

/// Injections queued by input handlers, applied before the next step.
#[derive(Resource, Default, Debug)]
pub struct PendingInjections {
    queue: Vec<Injection>,
}

impl PendingInjections {
    pub fn queue(&mut self, x: f32, y: f32, count: usize) {
        if count > 0 {
            self.queue.push(Injection {
                position: Vec2::new(x, y),
                count,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

fn sync_params(params: Res<SphParams>, mut state: ResMut<FluidState>) {
    if params.is_changed() {
        state.simulation.set_params(params.clone());
    }
}

fn apply_injections(mut pending: ResMut<PendingInjections>, mut state: ResMut<FluidState>) {
    for injection in pending.queue.drain(..) {
        state
            .simulation
            .add_particles(injection.position.x, injection.position.y, injection.count);
    }
}

fn run_simulation(time: Res<Time>, mut state: ResMut<FluidState>) {
    if state.paused && !state.step_requested {
        return;
    }

    let dt = state.simulation.params().clamp_frame_time(time.delta_secs());
    if dt <= 0.0 {
        return;
    }

    state.step_requested = false;
    state.simulation.step(dt);
}

fn report_stats(mut state: ResMut<FluidState>) {
    let frame = state.simulation.frame();
    if state.stats_interval == 0 || frame == state.last_report_frame || frame % state.stats_interval != 0 {
        return;
    }

    let stats = state.simulation.stats();
    debug!(
        "frame {}: {} particles, mean density {:.1} ({:.1}% error), {} on surface, max speed {:.1}",
        frame,
        stats.particle_count,
        stats.mean_density,
        stats.mean_density_error * 100.0,
        stats.surface_particles,
        stats.max_speed,
    );
    state.last_stats = stats;
    state.last_report_frame = frame;
}
