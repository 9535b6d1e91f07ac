//! Smoothed Particle Hydrodynamics (SPH) fluid in 2D.
//!
//! # Architecture
//!
//! - [`kernels`]: Poly6, spiky gradient and viscosity Laplacian kernels
//! - [`spatial`]: Uniform hash grid for neighbor search
//! - [`particle`]: Particle state and the per-particle physics phases
//! - [`boundary`]: Domain rectangle and damped wall bounces
//! - [`params`]: Simulation parameters and presets
//! - [`simulation`]: Particle arena and the sub-step pipeline
//! - [`render`]: Read-only views and instance buffers for renderers
//! - [`plugin`]: Bevy plugin driving the simulation once per frame
//!
//! # Example
//!
//! ```rust,no_run
//! use sph2d::fluid::prelude::*;
//!
//! let mut sim = Simulation::new(800.0, 600.0, 400, 16.0, 2);
//! for _ in 0..120 {
//!     sim.step(1.0 / 60.0);
//! }
//! sim.add_particles(400.0, 100.0, 20);
//! println!("{:?}", sim.stats());
//! ```

pub mod boundary;
pub mod kernels;
pub mod params;
pub mod particle;
pub mod plugin;
pub mod render;
pub mod simulation;
pub mod spatial;

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::boundary::*;
    pub use super::kernels::*;
    pub use super::params::*;
    pub use super::particle::*;
    pub use super::plugin::*;
    pub use super::render::*;
    pub use super::simulation::*;
    pub use super::spatial::*;
}
