//! Grid extents, axes and the dense field container.
//!
//! Memory layout is z-major (x varies fastest):
//! `index = k * (mx * my) + j * mx + i`

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{FinDiffError, Result};

/// One of the three grid extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Mx,
    My,
    Mz,
}

impl Dimension {
    /// All extents in storage order.
    pub const ALL: [Dimension; 3] = [Dimension::Mx, Dimension::My, Dimension::Mz];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Mx => "mx",
            Dimension::My => "my",
            Dimension::Mz => "mz",
        };
        f.write_str(name)
    }
}

/// Differentiation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Extent that runs along this axis.
    pub fn dimension(self) -> Dimension {
        match self {
            Axis::X => Dimension::Mx,
            Axis::Y => Dimension::My,
            Axis::Z => Dimension::Mz,
        }
    }

    /// Position in `[x, y, z]` arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Lowercase axis name.
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Grid extents `(mx, my, mz)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    pub mx: usize,
    pub my: usize,
    pub mz: usize,
}

impl Default for Domain {
    fn default() -> Self {
        Self::cubic(64)
    }
}

impl Domain {
    /// Create a domain from its three extents.
    pub const fn new(mx: usize, my: usize, mz: usize) -> Self {
        Self { mx, my, mz }
    }

    /// Create an `n × n × n` domain.
    pub const fn cubic(n: usize) -> Self {
        Self::new(n, n, n)
    }

    /// Total number of grid points.
    #[inline]
    pub fn len(&self) -> usize {
        self.mx * self.my * self.mz
    }

    /// Whether any extent is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of one `f32` field on this domain.
    pub fn bytes(&self) -> usize {
        self.len() * std::mem::size_of::<f32>()
    }

    /// Size of one extent.
    pub fn extent(&self, dimension: Dimension) -> usize {
        match dimension {
            Dimension::Mx => self.mx,
            Dimension::My => self.my,
            Dimension::Mz => self.mz,
        }
    }

    /// Number of points along an axis.
    #[inline]
    pub fn axis_len(&self, axis: Axis) -> usize {
        self.extent(axis.dimension())
    }

    /// Convert `(i, j, k)` to a linear index.
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        k * self.mx * self.my + j * self.mx + i
    }

    /// Convert a linear index to `(i, j, k)`.
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let slice = self.mx * self.my;
        let k = idx / slice;
        let rem = idx % slice;
        (rem % self.mx, rem / self.mx, k)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}×{}", self.mx, self.my, self.mz)
    }
}

/// Dense `f32` samples on a [`Domain`].
///
/// Used both as the read-only input field and as the derivative output.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    domain: Domain,
    data: Vec<f32>,
}

impl Field {
    /// A field of zeros.
    pub fn zeros(domain: Domain) -> Self {
        Self {
            domain,
            data: vec![0.0; domain.len()],
        }
    }

    /// Build a field by evaluating `f(i, j, k)` at every point.
    ///
    /// Z-slices are filled in parallel.
    pub fn from_fn<F>(domain: Domain, f: F) -> Self
    where
        F: Fn(usize, usize, usize) -> f32 + Sync,
    {
        let mut data = vec![0.0f32; domain.len()];
        let slice = domain.mx * domain.my;
        if slice > 0 {
            data.par_chunks_mut(slice).enumerate().for_each(|(k, chunk)| {
                for j in 0..domain.my {
                    for i in 0..domain.mx {
                        chunk[j * domain.mx + i] = f(i, j, k);
                    }
                }
            });
        }
        Self { domain, data }
    }

    /// Wrap an existing sample buffer.
    pub fn from_vec(domain: Domain, data: Vec<f32>) -> Result<Self> {
        if data.len() != domain.len() {
            return Err(FinDiffError::LengthMismatch {
                expected: domain.len(),
                actual: data.len(),
            });
        }
        Ok(Self { domain, data })
    }

    /// Domain of this field.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Sample at `(i, j, k)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f32 {
        self.data[self.domain.index(i, j, k)]
    }

    /// Overwrite the sample at `(i, j, k)`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f32) {
        let idx = self.domain.index(i, j, k);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Set every sample to `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Consume the field, returning its samples.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing() {
        let domain = Domain::new(8, 12, 16);

        let idx = domain.index(5, 10, 15);
        assert_eq!(domain.coords(idx), (5, 10, 15));

        assert_eq!(domain.index(0, 0, 0), 0);
        assert_eq!(domain.index(7, 11, 15), domain.len() - 1);
    }

    #[test]
    fn test_axis_lengths() {
        let domain = Domain::new(64, 32, 16);
        assert_eq!(domain.axis_len(Axis::X), 64);
        assert_eq!(domain.axis_len(Axis::Y), 32);
        assert_eq!(domain.axis_len(Axis::Z), 16);
        assert_eq!(domain.bytes(), 64 * 32 * 16 * 4);
    }

    #[test]
    fn test_from_fn_layout() {
        let domain = Domain::new(4, 5, 6);
        let field = Field::from_fn(domain, |i, j, k| (i + 10 * j + 100 * k) as f32);

        assert_eq!(field.get(3, 4, 5), 543.0);
        assert_eq!(field.as_slice()[domain.index(1, 2, 3)], 321.0);
    }

    #[test]
    fn test_from_vec_length_check() {
        let domain = Domain::cubic(4);
        assert!(Field::from_vec(domain, vec![0.0; 64]).is_ok());

        let err = Field::from_vec(domain, vec![0.0; 63]).unwrap_err();
        assert!(matches!(
            err,
            FinDiffError::LengthMismatch {
                expected: 64,
                actual: 63
            }
        ));
    }
}
