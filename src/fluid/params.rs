//! Fluid simulation parameters.
//!
//! These parameters control the behavior of the SPH solver. They can be
//! modified at runtime through the Bevy resource system; the simulation picks
//! them up on the next frame.

use bevy::prelude::*;

use super::boundary::{DEFAULT_DAMPING, DEFAULT_MARGIN};
use super::kernels::SphKernels;
use super::particle::SURFACE_THRESHOLD;

/// Parameters controlling the fluid simulation behavior.
///
/// Units are screen-like: lengths in domain units (pixels for a canvas
/// renderer), time in seconds, y pointing down.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct SphParams {
    /// Smoothing kernel radius (h). Also the spatial grid cell size.
    pub smoothing_radius: f32,

    /// Rest density of the fluid. Pressure is zero at or below it.
    pub rest_density: f32,

    /// Stiffness of the linear equation of state.
    pub gas_constant: f32,

    /// Viscosity coefficient. Higher values damp relative motion faster.
    pub viscosity: f32,

    /// Surface tension coefficient applied to free-surface particles.
    pub surface_tension: f32,

    /// Color-field gradient magnitude above which a particle counts as
    /// being on the free surface.
    pub surface_threshold: f32,

    /// Gravity acceleration vector.
    pub gravity: Vec2,

    /// Inset from each domain edge that particles may not cross.
    pub boundary_margin: f32,

    /// Fraction of normal velocity kept after hitting the boundary.
    pub boundary_damping: f32,

    /// Number of substeps per frame.
    /// More substeps = more stable at high speeds.
    pub sub_steps: u32,

    /// Largest frame delta fed to the solver, in seconds. Longer frames
    /// (hitches, tab switches) are clamped to this.
    pub max_frame_time: f32,

    /// Initial particle spacing as a fraction of the smoothing radius.
    pub spacing_factor: f32,

    /// Random jitter applied to spawned lattices, as a fraction of spacing.
    pub jitter: f32,

    /// Upper bound on the outward speed of injected particles.
    pub spawn_speed: f32,

    /// Particle mass. `None` derives it from the rest density and spacing.
    pub particle_mass: Option<f32>,

    /// Keep at most this many (closest) neighbors per particle.
    pub max_neighbors: Option<usize>,

    /// Run per-particle phases on the rayon thread pool.
    pub parallel: bool,

    /// Seed for spawn jitter and injection velocities. `None` uses entropy.
    pub seed: Option<u64>,
}

impl Default for SphParams {
    fn default() -> Self {
        Self {
            smoothing_radius: 16.0,
            rest_density: 1000.0,
            gas_constant: 2000.0,
            viscosity: 2000.0,
            surface_tension: 1000.0,
            surface_threshold: SURFACE_THRESHOLD,
            gravity: Vec2::new(0.0, 200.0),
            boundary_margin: DEFAULT_MARGIN,
            boundary_damping: DEFAULT_DAMPING,
            sub_steps: 2,
            max_frame_time: 1.0 / 60.0,
            spacing_factor: 0.5,
            jitter: 0.1,
            spawn_speed: 50.0,
            particle_mass: None,
            max_neighbors: None,
            parallel: false,
            seed: None,
        }
    }
}

impl SphParams {
    /// Water-like defaults.
    pub fn water() -> Self {
        Self::default()
    }

    /// Thick, slow fluid.
    pub fn viscous() -> Self {
        Self {
            viscosity: 6000.0,
            surface_tension: 2000.0,
            sub_steps: 3,
            ..Self::default()
        }
    }

    /// Low-viscosity fluid that splashes; needs more substeps to stay stable.
    pub fn splashy() -> Self {
        Self {
            viscosity: 800.0,
            surface_tension: 500.0,
            sub_steps: 4,
            ..Self::default()
        }
    }

    pub fn with_smoothing_radius(mut self, smoothing_radius: f32) -> Self {
        self.smoothing_radius = smoothing_radius;
        self
    }

    pub fn with_sub_steps(mut self, sub_steps: u32) -> Self {
        self.sub_steps = sub_steps;
        self
    }

    pub fn with_viscosity(mut self, viscosity: f32) -> Self {
        self.viscosity = viscosity;
        self
    }

    pub fn with_surface_tension(mut self, surface_tension: f32) -> Self {
        self.surface_tension = surface_tension;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_particle_mass(mut self, mass: f32) -> Self {
        self.particle_mass = Some(mass);
        self
    }

    pub fn with_max_neighbors(mut self, max_neighbors: usize) -> Self {
        self.max_neighbors = Some(max_neighbors);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable parallel phases.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Cell size for the spatial grid.
    /// Cell size must be >= smoothing radius for the 3x3 query to be complete.
    pub fn cell_size(&self) -> f32 {
        self.smoothing_radius
    }

    /// Distance between particles in spawned lattices.
    pub fn particle_spacing(&self) -> f32 {
        self.smoothing_radius * self.spacing_factor
    }

    /// Mass of a single particle.
    ///
    /// Without an explicit mass, picks the value for which a square lattice
    /// at [`Self::particle_spacing`] sits exactly at rest density.
    pub fn particle_mass(&self) -> f32 {
        self.particle_mass.unwrap_or_else(|| {
            let sum = SphKernels::lattice_density_sum(self.particle_spacing(), self.smoothing_radius);
            self.rest_density / sum
        })
    }

    /// Length of one substep for a frame of `frame_time` seconds.
    pub fn sub_step_dt(&self, frame_time: f32) -> f32 {
        frame_time / self.sub_steps.max(1) as f32
    }

    /// Clamp a wall-clock frame delta to the largest step the solver accepts.
    pub fn clamp_frame_time(&self, frame_time: f32) -> f32 {
        frame_time.min(self.max_frame_time)
    }

    /// Copy of the parameters with degenerate values replaced.
    ///
    /// Non-positive or non-finite radius and spacing fall back to the
    /// defaults, substeps are at least one and negative coefficients become
    /// zero. A neighbor cap of zero is treated as no cap.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let positive = |value: f32, fallback: f32| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        let non_negative = |value: f32| if value.is_finite() { value.max(0.0) } else { 0.0 };

        Self {
            smoothing_radius: positive(self.smoothing_radius, defaults.smoothing_radius),
            rest_density: positive(self.rest_density, defaults.rest_density),
            gas_constant: non_negative(self.gas_constant),
            viscosity: non_negative(self.viscosity),
            surface_tension: non_negative(self.surface_tension),
            surface_threshold: non_negative(self.surface_threshold),
            boundary_margin: non_negative(self.boundary_margin),
            boundary_damping: non_negative(self.boundary_damping),
            sub_steps: self.sub_steps.max(1),
            max_frame_time: positive(self.max_frame_time, defaults.max_frame_time),
            spacing_factor: positive(self.spacing_factor, defaults.spacing_factor),
            jitter: non_negative(self.jitter),
            spawn_speed: non_negative(self.spawn_speed),
            particle_mass: self.particle_mass.filter(|m| m.is_finite() && *m > 0.0),
            max_neighbors: self.max_neighbors.filter(|&n| n > 0),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let params = SphParams::default();

        assert_eq!(params.gravity, Vec2::new(0.0, 200.0));
        assert_eq!(params.surface_threshold, 0.1);
        assert_eq!(params.boundary_margin, 10.0);
        assert_eq!(params.boundary_damping, 0.8);
        assert_eq!(params.cell_size(), params.smoothing_radius);
    }

    #[test]
    fn test_calibrated_mass_hits_rest_density() {
        let params = SphParams::default();
        let mass = params.particle_mass();
        let lattice = SphKernels::lattice_density_sum(params.particle_spacing(), params.smoothing_radius);

        let density = mass * lattice;
        assert!((density - params.rest_density).abs() / params.rest_density < 1e-4);
    }

    #[test]
    fn test_explicit_mass_wins() {
        let params = SphParams::default().with_particle_mass(2.5);
        assert_eq!(params.particle_mass(), 2.5);
    }

    #[test]
    fn test_sub_step_dt_and_clamp() {
        let params = SphParams::default().with_sub_steps(4);

        assert!((params.sub_step_dt(0.02) - 0.005).abs() < 1e-9);
        assert_eq!(params.clamp_frame_time(0.5), 1.0 / 60.0);
        assert_eq!(params.clamp_frame_time(0.001), 0.001);
    }

    #[test]
    fn test_sanitized() {
        let params = SphParams {
            smoothing_radius: -1.0,
            sub_steps: 0,
            viscosity: -3.0,
            particle_mass: Some(f32::NAN),
            ..SphParams::default()
        }
        .sanitized();

        assert_eq!(params.smoothing_radius, 16.0);
        assert_eq!(params.sub_steps, 1);
        assert_eq!(params.viscosity, 0.0);
        assert_eq!(params.particle_mass, None);
    }
}
