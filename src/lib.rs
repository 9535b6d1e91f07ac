//! sph2d - 2D SPH fluid simulation for Bevy
//!
//! A weakly compressible fluid made of particles that interact through
//! smoothing kernels: density from Poly6, pressure from a clamped linear
//! equation of state, viscosity and color-field surface tension, advanced
//! with Störmer-Verlet inside a rectangular box.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bevy::prelude::*;
//! use sph2d::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .add_plugins(SphPlugin::new(800.0, 600.0, 400).with_params(SphParams::viscous()))
//!         .add_systems(Update, pour)
//!         .run();
//! }
//!
//! fn pour(state: Res<FluidState>, mut pending: ResMut<PendingInjections>) {
//!     if state.simulation.frame() % 120 == 1 {
//!         pending.queue(400.0, 60.0, 20);
//!     }
//! }
//! ```
//!
//! The simulation can also be driven without Bevy's scheduler through
//! [`fluid::simulation::Simulation`].

pub mod fluid;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::fluid::prelude::*;
}
