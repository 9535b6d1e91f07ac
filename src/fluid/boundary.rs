//! Rectangular domain boundary.
//!
//! The fluid lives in `[0, width] x [0, height]`, with y growing downward.
//! Particles are kept a fixed margin away from every edge: crossing the margin
//! clamps the position onto it and reflects the offending velocity component,
//! scaled by a damping factor (an inelastic bounce, not a penalty spring).

use bevy::prelude::*;

/// Default inset from each domain edge.
pub const DEFAULT_MARGIN: f32 = 10.0;

/// Default fraction of normal velocity kept after a bounce.
pub const DEFAULT_DAMPING: f32 = 0.8;

/// Axis-aligned simulation domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DomainBounds {
    /// Domain width.
    pub width: f32,
    /// Domain height.
    pub height: f32,
    /// Inset from each edge that particles may not cross.
    pub margin: f32,
    /// Restitution applied to the reflected velocity component.
    pub damping: f32,
}

impl Default for DomainBounds {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            margin: DEFAULT_MARGIN,
            damping: DEFAULT_DAMPING,
        }
    }
}

impl DomainBounds {
    /// Create a domain with the default margin and damping.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..default()
        }
    }

    /// Set the margin. Clamped so the usable region never inverts.
    pub fn with_margin(mut self, margin: f32) -> Self {
        let limit = 0.5 * self.width.min(self.height);
        self.margin = margin.clamp(0.0, limit.max(0.0));
        self
    }

    /// Set the damping factor.
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// Minimum corner of the usable region.
    pub fn min(&self) -> Vec2 {
        Vec2::splat(self.margin)
    }

    /// Maximum corner of the usable region.
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.width - self.margin, self.height - self.margin)
    }

    /// Center of the domain.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width, self.height) * 0.5
    }

    /// Check if a point is inside the usable region (edges included).
    pub fn contains(&self, point: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Clamp a point into the usable region.
    pub fn clamp_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min(), self.max())
    }

    /// Apply boundary collision to a particle.
    ///
    /// Returns `true` if the particle touched the boundary.
    pub fn apply_collision(&self, position: &mut Vec2, velocity: &mut Vec2) -> bool {
        let min = self.min();
        let max = self.max();
        let mut hit = false;

        // X axis
        if position.x < min.x {
            position.x = min.x;
            velocity.x = -velocity.x * self.damping;
            hit = true;
        } else if position.x > max.x {
            position.x = max.x;
            velocity.x = -velocity.x * self.damping;
            hit = true;
        }

        // Y axis
        if position.y < min.y {
            position.y = min.y;
            velocity.y = -velocity.y * self.damping;
            hit = true;
        } else if position.y > max.y {
            position.y = max.y;
            velocity.y = -velocity.y * self.damping;
            hit = true;
        }

        hit
    }
}
