//! Stencil weights and coordinate samples for a unit-length periodic domain.
//!
//! The first derivative is approximated by the radius-4 central difference
//!
//! ```text
//! df[i] = a (f[i+1] - f[i-1]) + b (f[i+2] - f[i-2])
//!       + c (f[i+3] - f[i-3]) + d (f[i+4] - f[i-4])
//! ```
//!
//! with `a = 4/5`, `b = -1/5`, `c = 4/105`, `d = -1/280`, each scaled by the
//! inverse grid spacing `N - 1`.

use crate::domain::{Axis, Domain};

/// Stencil radius (ghost cells on each side of a pencil).
pub const STENCIL_RADIUS: usize = 4;

/// The four weights of the radius-4 first-derivative stencil.
///
/// Laid out for direct use as kernel arguments.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StencilCoefficients {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl StencilCoefficients {
    /// Derive the weights for an axis of `axis_len` points spanning `[0, 1]`.
    ///
    /// `axis_len` must be at least 2.
    pub fn derive(axis_len: usize) -> Self {
        debug_assert!(axis_len >= 2, "axis length {axis_len} is below 2");
        let dsinv = axis_len as f32 - 1.0;

        Self {
            a: 4.0 / 5.0 * dsinv,
            b: -1.0 / 5.0 * dsinv,
            c: 4.0 / 105.0 * dsinv,
            d: -1.0 / 280.0 * dsinv,
        }
    }

    /// Weights in order of increasing offset.
    pub fn weights(&self) -> [f32; STENCIL_RADIUS] {
        [self.a, self.b, self.c, self.d]
    }

    /// Evaluate the stencil from the samples at offsets `+1..=+4` and `-1..=-4`.
    #[inline(always)]
    pub fn apply(&self, plus: [f32; STENCIL_RADIUS], minus: [f32; STENCIL_RADIUS]) -> f32 {
        self.a * (plus[0] - minus[0])
            + self.b * (plus[1] - minus[1])
            + self.c * (plus[2] - minus[2])
            + self.d * (plus[3] - minus[3])
    }
}

/// Sample positions `i / (n - 1)` for `i in 0..n`.
///
/// Both endpoints are included, so the last sample coincides with the first
/// under periodic wrap.
pub fn coordinate_samples(n: usize) -> Vec<f32> {
    let spacing = 1.0 / (n as f64 - 1.0);
    (0..n).map(|i| (i as f64 * spacing) as f32).collect()
}

/// Per-axis coordinate samples of a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSamples {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
}

impl CoordinateSamples {
    pub fn new(domain: Domain) -> Self {
        Self {
            x: coordinate_samples(domain.mx),
            y: coordinate_samples(domain.my),
            z: coordinate_samples(domain.mz),
        }
    }

    /// Samples along one axis.
    pub fn axis(&self, axis: Axis) -> &[f32] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_ratios() {
        let coeffs = StencilCoefficients::derive(64);
        let dsinv = 63.0f32;

        assert!((coeffs.a - 0.8 * dsinv).abs() < 1e-5);
        assert!((coeffs.b + 0.2 * dsinv).abs() < 1e-5);
        assert!((coeffs.c - 4.0 / 105.0 * dsinv).abs() < 1e-5);
        assert!((coeffs.d + 1.0 / 280.0 * dsinv).abs() < 1e-5);
    }

    #[test]
    fn test_weights_are_consistent() {
        // A linear ramp of slope 1 must differentiate to exactly dsinv * h = 1
        // when sampled with spacing h = 1 / dsinv.
        let coeffs = StencilCoefficients::derive(9);
        let h = 1.0 / 8.0;
        let plus = [h, 2.0 * h, 3.0 * h, 4.0 * h];
        let minus = [-h, -2.0 * h, -3.0 * h, -4.0 * h];

        let df = coeffs.apply(plus, minus);
        assert!((df - 1.0).abs() < 1e-5, "ramp derivative was {df}");
    }

    #[test]
    fn test_weights_are_bytes() {
        let coeffs = StencilCoefficients::derive(32);
        let bytes: &[u8] = bytemuck::bytes_of(&coeffs);
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn test_coordinate_samples() {
        let x = coordinate_samples(5);
        assert_eq!(x, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let samples = CoordinateSamples::new(Domain::new(8, 16, 32));
        assert_eq!(samples.axis(Axis::Y).len(), 16);
        assert_eq!(samples.axis(Axis::Z)[31], 1.0);
    }
}
