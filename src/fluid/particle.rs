//! Fluid particle state and per-particle SPH physics.
//!
//! A sub-step runs the phases below in order, each over every particle
//! before the next one starts:
//!
//! 1. neighbor search ([`Particle::find_neighbors`])
//! 2. density ([`Particle::compute_density`])
//! 3. pressure ([`Particle::update_pressure`])
//! 4. forces ([`Particle::pressure_force`], [`Particle::viscosity_force`],
//!    [`Particle::surface_tension`])
//! 5. integration ([`Particle::integrate`])
//!
//! Phases that read other particles take the whole arena by shared reference
//! and return a value; only the owning particle ever writes its own fields.

use bevy::prelude::*;

use super::boundary::DomainBounds;
use super::kernels::SphKernels;
use super::params::SphParams;
use super::spatial::SpatialGrid;

/// Color-field gradient magnitude above which a particle is on the free
/// surface.
pub const SURFACE_THRESHOLD: f32 = 0.1;

/// Stable particle identity, unique within one simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleId(pub u32);

/// A particle within one smoothing radius, found by the neighbor search.
///
/// `index` points into the particle arena and is only meaningful until the
/// next grid rebuild.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Free-surface detection result for one particle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceSample {
    pub color_field: f32,
    pub gradient: Vec2,
    pub laplacian: f32,
    pub is_surface: bool,
    /// Surface tension contribution to acceleration.
    pub force: Vec2,
}

/// A single SPH fluid particle.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub position: Vec2,
    /// Position one sub-step ago, for Verlet integration.
    pub previous_position: Vec2,
    /// Finite-difference velocity from the last integration.
    pub velocity: Vec2,
    /// SPH acceleration from the last force phase (gravity excluded).
    pub acceleration: Vec2,
    pub mass: f32,
    pub density: f32,
    pub pressure: f32,

    pub rest_density: f32,
    pub gas_constant: f32,
    pub viscosity: f32,
    pub surface_tension: f32,
    smoothing_radius: f32,
    smoothing_radius_sq: f32,

    pub color_field: f32,
    pub color_field_gradient: Vec2,
    pub color_field_laplacian: f32,
    pub is_surface: bool,

    /// False until the first integration after the velocity was set.
    verlet_started: bool,
}

impl Particle {
    /// Create a particle at rest, taking its constants from `params`.
    pub fn new(id: ParticleId, position: Vec2, params: &SphParams) -> Self {
        let h = params.smoothing_radius;
        Self {
            id,
            position,
            previous_position: position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            mass: params.particle_mass(),
            density: 0.0,
            pressure: 0.0,
            rest_density: params.rest_density,
            gas_constant: params.gas_constant,
            viscosity: params.viscosity,
            surface_tension: params.surface_tension,
            smoothing_radius: h,
            smoothing_radius_sq: h * h,
            color_field: 0.0,
            color_field_gradient: Vec2::ZERO,
            color_field_laplacian: 0.0,
            is_surface: false,
            verlet_started: false,
        }
    }

    /// Give the particle an initial velocity.
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.set_velocity(velocity);
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Overwrite the velocity. The next integration restarts Verlet from it.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
        self.previous_position = self.position;
        self.verlet_started = false;
    }

    pub fn smoothing_radius(&self) -> f32 {
        self.smoothing_radius
    }

    pub fn smoothing_radius_sq(&self) -> f32 {
        self.smoothing_radius_sq
    }

    pub fn set_smoothing_radius(&mut self, h: f32) {
        self.smoothing_radius = h;
        self.smoothing_radius_sq = h * h;
    }

    /// Copy the fluid constants (not the mass) from `params`.
    pub fn apply_material(&mut self, params: &SphParams) {
        self.rest_density = params.rest_density;
        self.gas_constant = params.gas_constant;
        self.viscosity = params.viscosity;
        self.surface_tension = params.surface_tension;
        self.set_smoothing_radius(params.smoothing_radius);
    }

    /// Density relative to rest density, for visual scaling.
    pub fn density_ratio(&self) -> f32 {
        if self.rest_density > 0.0 {
            self.density / self.rest_density
        } else {
            0.0
        }
    }

    /// Whether position and velocity are finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }

    /// Collect the particles within one smoothing radius into `out`.
    ///
    /// `index` is this particle's own arena slot and is skipped. With
    /// `max_neighbors` set, only the closest ones are kept.
    pub fn find_neighbors(
        &self,
        index: usize,
        particles: &[Particle],
        grid: &SpatialGrid,
        max_neighbors: Option<usize>,
        out: &mut Vec<Neighbor>,
    ) {
        out.clear();
        for candidate in grid.query_neighborhood(self.position) {
            if candidate == index {
                continue;
            }
            let distance_sq = self.position.distance_squared(particles[candidate].position);
            if distance_sq < self.smoothing_radius_sq {
                out.push(Neighbor {
                    index: candidate,
                    distance: distance_sq.sqrt(),
                });
            }
        }

        if let Some(max) = max_neighbors {
            if out.len() > max {
                out.select_nth_unstable_by(max, |a, b| a.distance.total_cmp(&b.distance));
                out.truncate(max);
            }
        }
    }

    /// Density from the self-contribution plus every neighbor.
    pub fn compute_density(&self, neighbors: &[Neighbor], particles: &[Particle]) -> f32 {
        let h = self.smoothing_radius;
        let mut density = self.mass * SphKernels::poly6(0.0, h);
        for neighbor in neighbors {
            density += particles[neighbor.index].mass * SphKernels::poly6(neighbor.distance, h);
        }
        density
    }

    /// Linear equation of state, clamped so under-dense regions never pull.
    pub fn update_pressure(&mut self) {
        self.pressure = (self.gas_constant * (self.density - self.rest_density)).max(0.0);
    }

    /// Symmetric pressure term pushing this particle away from its neighbors.
    pub fn pressure_force(&self, neighbors: &[Neighbor], particles: &[Particle]) -> Vec2 {
        let h = self.smoothing_radius;
        let mut force = Vec2::ZERO;
        for neighbor in neighbors {
            let other = &particles[neighbor.index];
            if neighbor.distance <= 0.0 || other.density <= 0.0 {
                continue;
            }
            let away = (self.position - other.position) / neighbor.distance;
            let shared = other.mass * (self.pressure + other.pressure) / (2.0 * other.density);
            force -= shared * SphKernels::spiky_gradient(neighbor.distance, h) * away;
        }
        force
    }

    /// Viscous diffusion toward the neighborhood velocity.
    pub fn viscosity_force(&self, neighbors: &[Neighbor], particles: &[Particle]) -> Vec2 {
        let h = self.smoothing_radius;
        let mut force = Vec2::ZERO;
        for neighbor in neighbors {
            let other = &particles[neighbor.index];
            if other.density <= 0.0 {
                continue;
            }
            let weight = self.viscosity * other.mass
                * SphKernels::viscosity_laplacian(neighbor.distance, h)
                / other.density;
            force += weight * (other.velocity - self.velocity);
        }
        force
    }

    /// Color-field surface detection and the resulting surface tension.
    ///
    /// The gradient points out of the fluid, so the tension term pulls
    /// surface particles back toward it.
    pub fn surface_tension(
        &self,
        neighbors: &[Neighbor],
        particles: &[Particle],
        threshold: f32,
    ) -> SurfaceSample {
        let h = self.smoothing_radius;
        let mut sample = SurfaceSample::default();

        for neighbor in neighbors {
            let other = &particles[neighbor.index];
            if other.density <= 0.0 {
                continue;
            }
            let volume = other.mass / other.density;
            sample.color_field += volume * SphKernels::poly6(neighbor.distance, h);
            sample.laplacian += volume * SphKernels::viscosity_laplacian(neighbor.distance, h);

            if neighbor.distance > 0.0 {
                let toward = (other.position - self.position) / neighbor.distance;
                sample.gradient += volume * SphKernels::spiky_gradient(neighbor.distance, h) * toward;
            }
        }

        let magnitude = sample.gradient.length();
        sample.is_surface = magnitude > threshold;
        if sample.is_surface && magnitude > 0.0 {
            sample.force = -self.surface_tension * sample.laplacian * (sample.gradient / magnitude);
        }
        sample
    }

    /// Store a surface sample computed by [`Self::surface_tension`].
    pub fn apply_surface(&mut self, sample: &SurfaceSample) {
        self.color_field = sample.color_field;
        self.color_field_gradient = sample.gradient;
        self.color_field_laplacian = sample.laplacian;
        self.is_surface = sample.is_surface;
    }

    /// Advance one sub-step with Störmer-Verlet and resolve the boundary.
    ///
    /// Gravity is added to the stored SPH acceleration; forces are treated as
    /// accelerations, with no division by mass. Returns `true` if the
    /// particle touched the boundary.
    pub fn integrate(&mut self, dt: f32, gravity: Vec2, bounds: &DomainBounds) -> bool {
        debug_assert!(dt > 0.0, "non-positive sub-step {dt}");
        let total = self.acceleration + gravity;

        let next = if self.verlet_started {
            2.0 * self.position - self.previous_position + total * dt * dt
        } else {
            // Taylor start from the explicit velocity.
            self.verlet_started = true;
            self.position + self.velocity * dt + 0.5 * total * dt * dt
        };

        self.velocity = (next - self.position) / dt;
        self.previous_position = self.position;
        self.position = next;

        let hit = bounds.apply_collision(&mut self.position, &mut self.velocity);
        if hit {
            // Carry the reflected velocity into the next Verlet step.
            self.previous_position = self.position - self.velocity * dt;
        }
        hit
    }
}
