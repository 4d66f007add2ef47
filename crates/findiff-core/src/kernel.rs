//! The parameterised derivative kernel.
//!
//! One routine serves all six (axis, variant) instances. An [`AxisMapping`]
//! translates a `(GroupId, UnitId)` pair into the stencil index `s` and
//! packed slot `p` it owns, and `(group, s, p)` into a global field index.
//!
//! A group runs three phases separated by two barriers:
//!
//! 1. [`DerivativeKernel::load`]: copy owned samples into the tile
//! 2. [`DerivativeKernel::fill_halo`]: units with `us < 4` write ghost cells
//! 3. [`DerivativeKernel::compute`]: evaluate the stencil at owned points
//!
//! The phases take the tile by shared reference so that a backend may run
//! the units of one group on different threads.

use std::fmt;

use crate::coefficients::{StencilCoefficients, STENCIL_RADIUS};
use crate::domain::{Axis, Domain};
use crate::launch_config::LaunchGeometry;
use crate::tile::Tile;

/// Index of a work group in the group grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GroupId {
    pub x: u32,
    pub y: u32,
}

impl GroupId {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Index of a unit within its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UnitId {
    pub x: u32,
    pub y: u32,
}

impl UnitId {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Coordinate transform between group-local `(s, p)` and the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMapping {
    axis: Axis,
    domain: Domain,
    pencils: usize,
}

impl AxisMapping {
    pub fn new(axis: Axis, domain: Domain, pencils: usize) -> Self {
        Self {
            axis,
            domain,
            pencils,
        }
    }

    /// Split a unit index into `(stencil, packed)` components.
    #[inline]
    pub fn split_unit(&self, unit: UnitId) -> (usize, usize) {
        match self.axis {
            Axis::X => (unit.x as usize, unit.y as usize),
            Axis::Y | Axis::Z => (unit.y as usize, unit.x as usize),
        }
    }

    /// Split a group shape into `(stencil, packed)` extents.
    #[inline]
    pub fn split_shape(&self, block_dim: (u32, u32, u32)) -> (usize, usize) {
        self.split_unit(UnitId::new(block_dim.0, block_dim.1))
    }

    /// Field coordinates `(i, j, k)` of stencil index `s`, slot `p` in `group`.
    #[inline]
    pub fn coords(&self, group: GroupId, s: usize, p: usize) -> (usize, usize, usize) {
        let packed = group.x as usize * self.pencils + p;
        let outer = group.y as usize;
        match self.axis {
            Axis::X => (s, packed, outer),
            Axis::Y => (packed, s, outer),
            Axis::Z => (packed, outer, s),
        }
    }

    /// Linear field index of stencil index `s`, slot `p` in `group`.
    #[inline]
    pub fn global(&self, group: GroupId, s: usize, p: usize) -> usize {
        let (i, j, k) = self.coords(group, s, p);
        self.domain.index(i, j, k)
    }
}

/// One (axis, variant) instance of the derivative kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivativeKernel {
    geometry: LaunchGeometry,
    coefficients: StencilCoefficients,
    mapping: AxisMapping,
    /// Units along (stencil, packed).
    shape: (usize, usize),
}

impl DerivativeKernel {
    /// Bind a geometry to the stencil weights of its axis.
    pub fn new(geometry: LaunchGeometry, coefficients: StencilCoefficients) -> Self {
        let mapping = AxisMapping::new(geometry.axis(), geometry.domain(), geometry.pencils());
        let shape = mapping.split_shape(geometry.block_dim());
        Self {
            geometry,
            coefficients,
            mapping,
            shape,
        }
    }

    pub fn geometry(&self) -> &LaunchGeometry {
        &self.geometry
    }

    pub fn coefficients(&self) -> &StencilCoefficients {
        &self.coefficients
    }

    pub fn mapping(&self) -> &AxisMapping {
        &self.mapping
    }

    pub fn axis(&self) -> Axis {
        self.geometry.axis()
    }

    pub fn domain(&self) -> Domain {
        self.geometry.domain()
    }

    /// Entry-point name of this instance.
    pub fn name(&self) -> String {
        self.geometry.kernel_name()
    }

    /// Every group of the launch grid, x fastest.
    pub fn groups(&self) -> impl Iterator<Item = GroupId> + Clone {
        let (gx, gy, _) = self.geometry.grid_dim();
        (0..gy).flat_map(move |y| (0..gx).map(move |x| GroupId::new(x, y)))
    }

    /// Every unit of one group, x fastest.
    pub fn units(&self) -> impl Iterator<Item = UnitId> + Clone {
        let (bx, by, _) = self.geometry.block_dim();
        (0..by).flat_map(move |y| (0..bx).map(move |x| UnitId::new(x, y)))
    }

    /// Allocate a fresh tile for one group.
    pub fn new_tile(&self) -> Tile {
        let (n, pencils) = self.geometry.tile_dims();
        Tile::new(n, pencils)
    }

    /// Stencil indices owned by `unit`.
    fn owned_stencil(&self, unit: UnitId) -> impl Iterator<Item = usize> {
        let (us, _) = self.mapping.split_unit(unit);
        (us..self.geometry.axis_len()).step_by(self.shape.0)
    }

    /// Packed slots owned by `unit`.
    fn owned_packed(&self, unit: UnitId) -> impl Iterator<Item = usize> + Clone {
        let (_, up) = self.mapping.split_unit(unit);
        (up..self.geometry.pencils()).step_by(self.shape.1)
    }

    /// Load phase: copy the unit's owned samples from `input` into `tile`.
    pub fn load(&self, group: GroupId, unit: UnitId, input: &[f32], tile: &Tile) {
        let packed = self.owned_packed(unit);
        for s in self.owned_stencil(unit) {
            for p in packed.clone() {
                let value = input[self.mapping.global(group, s, p)];
                tile.set(s as isize, p, value);
            }
        }
    }

    /// Halo phase: units with a stencil index below the radius replicate the
    /// periodic wrap into the ghost cells of their owned pencils.
    ///
    /// The first and last samples coincide, so the wrap period is `N - 1`:
    /// ghost `-r` copies `N - 1 - r` and ghost `N - 1 + r` copies `r`.
    pub fn fill_halo(&self, unit: UnitId, tile: &Tile) {
        let (us, _) = self.mapping.split_unit(unit);
        if us >= STENCIL_RADIUS {
            return;
        }

        let n = self.geometry.axis_len() as isize;
        let r = STENCIL_RADIUS as isize;
        let us = us as isize;
        for p in self.owned_packed(unit) {
            tile.set(us - r, p, tile.get(us + n - r - 1, p));
            tile.set(us + n, p, tile.get(us + 1, p));
        }
    }

    /// Compute phase: evaluate the stencil at the unit's owned points and
    /// hand each `(field index, derivative)` pair to `emit`.
    pub fn compute<F>(&self, group: GroupId, unit: UnitId, tile: &Tile, mut emit: F)
    where
        F: FnMut(usize, f32),
    {
        let packed = self.owned_packed(unit);
        for s in self.owned_stencil(unit) {
            let s = s as isize;
            for p in packed.clone() {
                let plus = [
                    tile.get(s + 1, p),
                    tile.get(s + 2, p),
                    tile.get(s + 3, p),
                    tile.get(s + 4, p),
                ];
                let minus = [
                    tile.get(s - 1, p),
                    tile.get(s - 2, p),
                    tile.get(s - 3, p),
                    tile.get(s - 4, p),
                ];
                emit(
                    self.mapping.global(group, s as usize, p),
                    self.coefficients.apply(plus, minus),
                );
            }
        }
    }

    /// Run all three phases of one group on the calling thread.
    ///
    /// Phase order stands in for the barriers.
    pub fn run_group<F>(&self, group: GroupId, input: &[f32], tile: &Tile, mut emit: F)
    where
        F: FnMut(usize, f32),
    {
        for unit in self.units() {
            self.load(group, unit, input, tile);
        }
        for unit in self.units() {
            self.fill_halo(unit, tile);
        }
        for unit in self.units() {
            self.compute(group, unit, tile, &mut emit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch_config::PencilVariant;

    fn kernel(domain: Domain, axis: Axis, variant: PencilVariant) -> DerivativeKernel {
        let geometry = LaunchGeometry::for_variant(domain, variant, axis).unwrap();
        let coeffs = StencilCoefficients::derive(domain.axis_len(axis));
        DerivativeKernel::new(geometry, coeffs)
    }

    #[test]
    fn test_global_mapping() {
        let domain = Domain::new(16, 32, 64);
        let x = AxisMapping::new(Axis::X, domain, 4);
        let y = AxisMapping::new(Axis::Y, domain, 4);
        let z = AxisMapping::new(Axis::Z, domain, 4);
        let group = GroupId::new(2, 3);

        assert_eq!(x.coords(group, 5, 1), (5, 9, 3));
        assert_eq!(y.coords(group, 5, 1), (9, 5, 3));
        assert_eq!(z.coords(group, 5, 1), (9, 3, 5));
        assert_eq!(z.global(group, 5, 1), domain.index(9, 3, 5));
    }

    #[test]
    fn test_unit_split() {
        let x = AxisMapping::new(Axis::X, Domain::cubic(8), 4);
        let z = AxisMapping::new(Axis::Z, Domain::cubic(8), 4);
        assert_eq!(x.split_unit(UnitId::new(6, 2)), (6, 2));
        assert_eq!(z.split_unit(UnitId::new(2, 6)), (6, 2));
    }

    #[test]
    fn test_every_point_written_once() {
        for domain in [Domain::new(32, 64, 64), Domain::new(32, 64, 36), Domain::new(32, 64, 12)] {
            for axis in Axis::ALL {
                for variant in PencilVariant::ALL {
                    let kernel = kernel(domain, axis, variant);
                    let input = vec![0.0f32; domain.len()];
                    let mut hits = vec![0u32; domain.len()];

                    for group in kernel.groups() {
                        let tile = kernel.new_tile();
                        kernel.run_group(group, &input, &tile, |idx, _| hits[idx] += 1);
                    }

                    assert!(
                        hits.iter().all(|&h| h == 1),
                        "{} does not cover {:?} exactly once",
                        kernel.name(),
                        domain
                    );
                }
            }
        }
    }

    #[test]
    fn test_halo_wraps_with_shared_endpoint() {
        let domain = Domain::cubic(16);
        let kernel = kernel(domain, Axis::X, PencilVariant::Small);
        let input: Vec<f32> = (0..domain.len()).map(|i| (i % 16) as f32).collect();
        let tile = kernel.new_tile();
        let group = GroupId::new(0, 0);

        for unit in kernel.units() {
            kernel.load(group, unit, &input, &tile);
        }
        for unit in kernel.units() {
            kernel.fill_halo(unit, &tile);
        }

        for p in 0..4 {
            assert_eq!(tile.get(-1, p), 14.0);
            assert_eq!(tile.get(-4, p), 11.0);
            assert_eq!(tile.get(16, p), 1.0);
            assert_eq!(tile.get(19, p), 4.0);
        }
    }

    #[test]
    fn test_large_unit_owns_strided_slots() {
        let kernel = kernel(Domain::cubic(64), Axis::Y, PencilVariant::Large);
        let unit = UnitId::new(3, 2);

        let stencil: Vec<usize> = kernel.owned_stencil(unit).collect();
        let packed: Vec<usize> = kernel.owned_packed(unit).collect();

        assert_eq!(stencil, vec![2, 10, 18, 26, 34, 42, 50, 58]);
        assert_eq!(packed, vec![3]);
    }
}
