//! Fluid simulation core logic.
//!
//! [`Simulation`] owns the particle arena and the spatial grid and advances
//! them one rendered frame at a time. Each frame is split into sub-steps; a
//! sub-step rebuilds the grid and then runs every physics phase over the
//! whole arena before starting the next one.

use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use super::boundary::DomainBounds;
use super::params::SphParams;
use super::particle::{Neighbor, Particle, ParticleId};
use super::render::{ParticleInstance, ParticleView};
use super::spatial::SpatialGrid;

/// Aggregate state of the fluid after the last step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationStats {
    pub particle_count: usize,
    pub mean_density: f32,
    /// Mean of |density - rest density| / rest density.
    pub mean_density_error: f32,
    pub surface_particles: usize,
    pub max_speed: f32,
    /// Particles whose position or velocity is NaN or infinite.
    pub non_finite: usize,
}

/// 2D SPH fluid simulation.
pub struct Simulation {
    params: SphParams,
    bounds: DomainBounds,
    particles: Vec<Particle>,
    grid: SpatialGrid,
    /// Per-particle neighbor lists, valid for the current sub-step only.
    neighbors: Vec<Vec<Neighbor>>,
    rng: StdRng,
    next_id: u32,
    frame: u64,
    time: f32,
}

impl Simulation {
    /// Creates a simulation with default parameters and a block of
    /// `particle_count` particles resting above the vertical center.
    pub fn new(
        width: f32,
        height: f32,
        particle_count: usize,
        smoothing_radius: f32,
        sub_steps: u32,
    ) -> Self {
        let params = SphParams::default()
            .with_smoothing_radius(smoothing_radius)
            .with_sub_steps(sub_steps);
        Self::from_params(width, height, particle_count, params)
    }

    /// Creates a simulation from explicit parameters.
    pub fn from_params(width: f32, height: f32, particle_count: usize, params: SphParams) -> Self {
        let params = params.sanitized();
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut simulation = Self {
            bounds: Self::bounds_for(width, height, &params),
            grid: SpatialGrid::new(params.cell_size()),
            particles: Vec::with_capacity(particle_count),
            neighbors: Vec::with_capacity(particle_count),
            rng,
            next_id: 0,
            frame: 0,
            time: 0.0,
            params,
        };
        simulation.spawn_block(particle_count);

        info!(
            "SPH simulation: {} particles in {}x{} (h = {}, mass = {:.1}, {} substeps)",
            simulation.particles.len(),
            width,
            height,
            simulation.params.smoothing_radius,
            simulation.params.particle_mass(),
            simulation.params.sub_steps,
        );
        simulation
    }

    fn bounds_for(width: f32, height: f32, params: &SphParams) -> DomainBounds {
        DomainBounds::new(width, height)
            .with_margin(params.boundary_margin)
            .with_damping(params.boundary_damping)
    }

    pub fn params(&self) -> &SphParams {
        &self.params
    }

    /// Replace the parameters and apply the fluid constants to every
    /// particle. Particle masses are reset to the new parameters' mass.
    pub fn set_params(&mut self, params: SphParams) {
        let params = params.sanitized();
        if params == self.params {
            return;
        }
        self.bounds = Self::bounds_for(self.bounds.width, self.bounds.height, &params);
        let mass = params.particle_mass();
        for particle in &mut self.particles {
            particle.apply_material(&params);
            particle.mass = mass;
        }
        debug!("SPH parameters updated: {:?}", params);
        self.params = params;
    }

    pub fn bounds(&self) -> &DomainBounds {
        &self.bounds
    }

    /// Returns the number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Look up a particle by id.
    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        // Ids are handed out in increasing order and never removed.
        self.particles
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|index| &self.particles[index])
    }

    /// Number of frames stepped so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Remove every particle. Ids keep counting up.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.neighbors.clear();
        self.grid.rebuild(std::iter::empty(), self.params.cell_size());
    }

    /// Render-facing view of every particle.
    pub fn views(&self) -> impl Iterator<Item = ParticleView> + '_ {
        self.particles.iter().map(ParticleView::from)
    }

    /// Refill `out` with one instance record per particle.
    pub fn write_instances(&self, out: &mut Vec<ParticleInstance>) {
        out.clear();
        out.extend(self.particles.iter().map(ParticleInstance::from));
    }

    /// Advance one rendered frame of `frame_time` seconds.
    ///
    /// The caller is expected to clamp `frame_time` to
    /// [`SphParams::max_frame_time`]; zero, negative and non-finite frame
    /// times are ignored.
    pub fn step(&mut self, frame_time: f32) {
        if !frame_time.is_finite() || frame_time <= 0.0 {
            return;
        }

        let dt = self.params.sub_step_dt(frame_time);
        if !self.particles.is_empty() {
            for _ in 0..self.params.sub_steps {
                self.sub_step(dt);
            }
        }

        self.frame += 1;
        self.time += frame_time;

        let non_finite = self.particles.iter().filter(|p| !p.is_finite()).count();
        if non_finite > 0 {
            warn!(
                "frame {}: {} of {} particles have non-finite state",
                self.frame,
                non_finite,
                self.particles.len()
            );
        }
    }

    /// Single simulation substep.
    fn sub_step(&mut self, dt: f32) {
        // 1. Rebuild spatial grid
        self.grid
            .rebuild(self.particles.iter().map(|p| p.position), self.params.cell_size());

        // 2. Neighbor search
        self.find_neighbors();

        // 3. Density
        let densities = self.map_particles(|p, neighbors, particles| {
            p.compute_density(neighbors, particles)
        });
        for (particle, density) in self.particles.iter_mut().zip(densities) {
            particle.density = density;
        }

        // 4. Pressure
        self.for_each_particle(Particle::update_pressure);

        // 5. Forces
        let threshold = self.params.surface_threshold;
        let forces = self.map_particles(|p, neighbors, particles| {
            let surface = p.surface_tension(neighbors, particles, threshold);
            let force = p.pressure_force(neighbors, particles) + p.viscosity_force(neighbors, particles);
            (force, surface)
        });
        for (particle, (force, surface)) in self.particles.iter_mut().zip(forces) {
            particle.apply_surface(&surface);
            particle.acceleration = force + surface.force;
        }

        // 6. Integrate and resolve boundary
        let gravity = self.params.gravity;
        let bounds = self.bounds;
        self.for_each_particle(move |p| {
            p.integrate(dt, gravity, &bounds);
        });
    }

    fn find_neighbors(&mut self) {
        self.neighbors.resize_with(self.particles.len(), Vec::new);

        let particles = &self.particles;
        let grid = &self.grid;
        let max_neighbors = self.params.max_neighbors;

        if self.params.parallel {
            self.neighbors.par_iter_mut().enumerate().for_each(|(index, out)| {
                particles[index].find_neighbors(index, particles, grid, max_neighbors, out);
            });
        } else {
            for (index, out) in self.neighbors.iter_mut().enumerate() {
                particles[index].find_neighbors(index, particles, grid, max_neighbors, out);
            }
        }
    }

    /// Evaluate `f` for every particle against the read-only arena and
    /// collect the results in arena order.
    fn map_particles<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&Particle, &[Neighbor], &[Particle]) -> T + Sync + Send,
    {
        debug_assert_eq!(self.neighbors.len(), self.particles.len());
        let particles = &self.particles;
        let neighbors = &self.neighbors;
        let eval = |index: usize| f(&particles[index], &neighbors[index], particles);

        if self.params.parallel {
            (0..particles.len()).into_par_iter().map(eval).collect()
        } else {
            (0..particles.len()).map(eval).collect()
        }
    }

    fn for_each_particle<F>(&mut self, f: F)
    where
        F: Fn(&mut Particle) + Sync + Send,
    {
        if self.params.parallel {
            self.particles.par_iter_mut().for_each(f);
        } else {
            self.particles.iter_mut().for_each(f);
        }
    }

    /// Spawns a jittered rectangular block whose bottom edge sits at the
    /// vertical center of the domain.
    fn spawn_block(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let spacing = self.params.particle_spacing();
        let jitter = self.params.jitter * spacing;
        let columns = (count as f32).sqrt().ceil() as usize;
        let rows = count.div_ceil(columns);

        let center = self.bounds.center();
        let origin = Vec2::new(
            center.x - (columns - 1) as f32 * spacing * 0.5,
            center.y - rows as f32 * spacing,
        );

        for i in 0..count {
            let cell = Vec2::new((i % columns) as f32, (i / columns) as f32);
            let offset = Vec2::new(self.rng.random::<f32>() - 0.5, self.rng.random::<f32>() - 0.5);
            let position = self.bounds.clamp_point(origin + cell * spacing + offset * jitter);
            let id = self.allocate_id();
            self.particles.push(Particle::new(id, position, &self.params));
        }
    }

    /// Spawns `count` particles on a ring around `(x, y)` moving outward at
    /// random speeds, and returns their ids.
    pub fn add_particles(&mut self, x: f32, y: f32, count: usize) -> Vec<ParticleId> {
        let spacing = self.params.particle_spacing();
        let radius = (spacing * count as f32 / TAU).max(0.5 * spacing);
        let center = Vec2::new(x, y);

        let mut ids = Vec::with_capacity(count);
        for k in 0..count {
            let direction = Vec2::from_angle(TAU * k as f32 / count as f32);
            let position = self.bounds.clamp_point(center + direction * radius);
            let speed = self.rng.random::<f32>() * self.params.spawn_speed;
            let id = self.allocate_id();
            self.particles
                .push(Particle::new(id, position, &self.params).with_velocity(direction * speed));
            ids.push(id);
        }

        debug!(
            "Injected {} particles at ({:.1}, {:.1}), {} total",
            count,
            x,
            y,
            self.particles.len()
        );
        ids
    }

    fn allocate_id(&mut self) -> ParticleId {
        let id = ParticleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Summary of the fluid state as of the last step.
    pub fn stats(&self) -> SimulationStats {
        let count = self.particles.len();
        if count == 0 {
            return SimulationStats::default();
        }

        let rest = self.params.rest_density;
        let mut stats = SimulationStats {
            particle_count: count,
            ..default()
        };
        let mut density_sum = 0.0;
        let mut error_sum = 0.0;
        for particle in &self.particles {
            density_sum += particle.density;
            error_sum += (particle.density - rest).abs() / rest;
            stats.max_speed = stats.max_speed.max(particle.velocity.length());
            if particle.is_surface {
                stats.surface_particles += 1;
            }
            if !particle.is_finite() {
                stats.non_finite += 1;
            }
        }
        stats.mean_density = density_sum / count as f32;
        stats.mean_density_error = error_sum / count as f32;
        stats
    }
}
