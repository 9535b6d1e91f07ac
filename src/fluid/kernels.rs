//! SPH smoothing kernels.
//!
//! All kernels take the scalar distance `r` between two particles and the
//! smoothing radius `h`, and vanish for `r >= h`. They are even in `r`, so
//! evaluating a pair from either side gives the same weight.

use std::f32::consts::PI;

/// SPH kernel functions.
pub struct SphKernels;

impl SphKernels {
    /// Poly6 kernel for density estimation.
    /// W(r, h) = (315 / 64πh⁹) * (h² - r²)³ for r < h
    #[inline]
    pub fn poly6(r: f32, h: f32) -> f32 {
        if r >= h {
            return 0.0;
        }
        let diff = h * h - r * r;
        Self::poly6_coefficient(h) * diff * diff * diff
    }

    /// Spiky gradient magnitude for pressure and color-field gradients.
    /// ∇W(r, h) = -(45 / πh⁶) * (h - r)² for 0 < r < h
    ///
    /// Returns a scalar; the caller multiplies it by the unit separation
    /// vector exactly once. Zero at `r == 0`, where the direction is undefined.
    #[inline]
    pub fn spiky_gradient(r: f32, h: f32) -> f32 {
        if r >= h || r <= 0.0 {
            return 0.0;
        }
        let diff = h - r;
        Self::spiky_gradient_coefficient(h) * diff * diff
    }

    /// Laplacian of viscosity kernel.
    /// ∇²W(r, h) = (45 / πh⁶) * (h - r) for r < h
    #[inline]
    pub fn viscosity_laplacian(r: f32, h: f32) -> f32 {
        if r >= h {
            return 0.0;
        }
        Self::viscosity_laplacian_coefficient(h) * (h - r)
    }

    #[inline]
    pub fn poly6_coefficient(h: f32) -> f32 {
        315.0 / (64.0 * PI * h.powi(9))
    }

    #[inline]
    pub fn spiky_gradient_coefficient(h: f32) -> f32 {
        -45.0 / (PI * h.powi(6))
    }

    #[inline]
    pub fn viscosity_laplacian_coefficient(h: f32) -> f32 {
        45.0 / (PI * h.powi(6))
    }

    /// Sum of Poly6 weights seen by a particle sitting in an infinite square
    /// lattice with the given spacing, self-contribution included.
    ///
    /// Used to pick a particle mass for which a lattice at rest spacing has
    /// exactly the rest density.
    pub fn lattice_density_sum(spacing: f32, h: f32) -> f32 {
        let reach = (h / spacing).ceil() as i32;
        let mut sum = 0.0;
        for i in -reach..=reach {
            for j in -reach..=reach {
                let r = (i as f32 * spacing).hypot(j as f32 * spacing);
                sum += Self::poly6(r, h);
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poly6_kernel() {
        let h = 1.0;

        // At r=0, kernel should be maximum
        let w_0 = SphKernels::poly6(0.0, h);
        assert!(w_0 > 0.0);
        assert!((w_0 - 315.0 / (64.0 * PI)).abs() < 1e-4);

        // At r=h, kernel should be 0
        assert_eq!(SphKernels::poly6(h, h), 0.0);

        // Kernel should decrease with distance
        let w_half = SphKernels::poly6(0.5 * h, h);
        assert!(w_half < w_0);
        assert!(w_half > 0.0);
    }

    #[test]
    fn test_kernels_vanish_outside_support() {
        for h in [0.5_f32, 1.0, 16.0, 40.0] {
            for scale in [1.0_f32, 1.0001, 1.5, 3.0, 100.0] {
                let r = h * scale;
                assert_eq!(SphKernels::poly6(r, h), 0.0);
                assert_eq!(SphKernels::spiky_gradient(r, h), 0.0);
                assert_eq!(SphKernels::viscosity_laplacian(r, h), 0.0);
            }
        }
    }

    #[test]
    fn test_kernels_continuous_at_support_boundary() {
        let h = 16.0_f32;
        let inside = h * (1.0 - 1e-4);

        let poly6_peak = SphKernels::poly6(0.0, h);
        let laplacian_peak = SphKernels::viscosity_laplacian(0.0, h);

        assert!(SphKernels::poly6(inside, h) / poly6_peak < 1e-6);
        assert!(SphKernels::viscosity_laplacian(inside, h) / laplacian_peak < 1e-3);
    }

    #[test]
    fn test_spiky_gradient() {
        let h = 1.0;

        // At r=0, gradient should be zero (undefined direction)
        assert_eq!(SphKernels::spiky_gradient(0.0, h), 0.0);

        // Coefficient is negative inside the support and grows toward the center
        let near = SphKernels::spiky_gradient(0.1, h);
        let far = SphKernels::spiky_gradient(0.9, h);
        assert!(near < 0.0);
        assert!(far < 0.0);
        assert!(near.abs() > far.abs());

        let expected = -45.0 / PI * 0.25;
        assert!((SphKernels::spiky_gradient(0.5, h) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_viscosity_laplacian() {
        let h = 2.0;
        let expected = 45.0 / (PI * 64.0) * 1.5;
        assert!((SphKernels::viscosity_laplacian(0.5, h) - expected).abs() < 1e-6);
        assert!(SphKernels::viscosity_laplacian(0.0, h) > SphKernels::viscosity_laplacian(1.0, h));
    }

    #[test]
    fn test_lattice_density_sum() {
        let h = 16.0;
        let sum = SphKernels::lattice_density_sum(8.0, h);

        // Self term plus a positive contribution from the ring of neighbors
        assert!(sum > SphKernels::poly6(0.0, h));

        // A lattice coarser than h only sees itself
        let sparse = SphKernels::lattice_density_sum(20.0, h);
        assert_eq!(sparse, SphKernels::poly6(0.0, h));
    }
}
