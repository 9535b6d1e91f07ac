//! Read-only render surface.
//!
//! Renderers never touch [`Particle`] directly. They either iterate
//! [`ParticleView`]s or upload a flat buffer of [`ParticleInstance`]s, e.g.
//! drawing each particle as a circle tinted by its density ratio and outlined
//! when it sits on the free surface.

use bevy::prelude::*;

use super::particle::{Particle, ParticleId};

/// What a renderer needs to draw one particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleView {
    pub id: ParticleId,
    pub position: Vec2,
    /// Density relative to rest density.
    pub density_ratio: f32,
    pub is_surface: bool,
}

impl From<&Particle> for ParticleView {
    fn from(particle: &Particle) -> Self {
        Self {
            id: particle.id,
            position: particle.position,
            density_ratio: particle.density_ratio(),
            is_surface: particle.is_surface,
        }
    }
}

/// GPU-compatible per-particle instance record.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 2],
    pub density_ratio: f32,
    /// 1 for free-surface particles, 0 otherwise.
    pub surface: u32,
}

impl ParticleInstance {
    pub fn position(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }

    pub fn is_surface(&self) -> bool {
        self.surface != 0
    }
}

impl From<&Particle> for ParticleInstance {
    fn from(particle: &Particle) -> Self {
        Self {
            position: particle.position.to_array(),
            density_ratio: particle.density_ratio(),
            surface: particle.is_surface as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fluid::params::SphParams;
    use crate::fluid::simulation::Simulation;

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 16);

        let instances = [
            ParticleInstance {
                position: [1.0, 2.0],
                density_ratio: 0.5,
                surface: 1,
            },
            ParticleInstance::default(),
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&instances);
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[12..16], &1u32.to_ne_bytes());
    }

    #[test]
    fn test_views_follow_particles() {
        let params = SphParams::default().with_seed(3);
        let mut sim = Simulation::from_params(120.0, 200.0, 25, params);
        sim.step(1.0 / 60.0);

        let views: Vec<ParticleView> = sim.views().collect();
        assert_eq!(views.len(), sim.len());
        for (view, particle) in views.iter().zip(sim.particles()) {
            assert_eq!(view.id, particle.id);
            assert_eq!(view.position, particle.position);
            assert_eq!(view.is_surface, particle.is_surface);
            assert!(view.density_ratio > 0.0);
        }
    }

    #[test]
    fn test_write_instances_refills_buffer() {
        let params = SphParams::default().with_seed(8);
        let mut sim = Simulation::from_params(120.0, 200.0, 16, params);
        sim.step(1.0 / 60.0);

        let mut buffer = vec![ParticleInstance::default(); 64];
        sim.write_instances(&mut buffer);

        assert_eq!(buffer.len(), 16);
        for (instance, particle) in buffer.iter().zip(sim.particles()) {
            assert_eq!(instance.position(), particle.position);
            assert_eq!(instance.is_surface(), particle.is_surface);
        }
    }
}
