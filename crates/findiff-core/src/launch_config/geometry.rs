//! Work decomposition for one (axis, pencil variant) pair.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DeviceLimits;
use crate::coefficients::STENCIL_RADIUS;
use crate::domain::{Axis, Dimension, Domain};
use crate::error::ConfigError;

/// Pencils per group for the small variant (one point per unit).
pub const SMALL_PENCILS: u32 = 4;

/// Pencils per group for the large variant (strided points per unit).
pub const LARGE_PENCILS: u32 = 32;

/// Tiling granularity of a derivative kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PencilVariant {
    /// `SMALL_PENCILS` pencils per group; each unit owns one point.
    #[default]
    Small,
    /// `LARGE_PENCILS` pencils per group with the same unit count as
    /// `Small`; each unit iterates a strided set of points.
    Large,
}

impl PencilVariant {
    /// Both variants, small first.
    pub const ALL: [PencilVariant; 2] = [PencilVariant::Small, PencilVariant::Large];

    /// Pencils per group.
    pub fn pencil_width(self) -> u32 {
        match self {
            PencilVariant::Small => SMALL_PENCILS,
            PencilVariant::Large => LARGE_PENCILS,
        }
    }

    /// Variant with the given pencil width.
    pub fn from_width(width: u32) -> Result<Self, ConfigError> {
        match width {
            SMALL_PENCILS => Ok(PencilVariant::Small),
            LARGE_PENCILS => Ok(PencilVariant::Large),
            other => Err(ConfigError::UnsupportedPencilWidth(other)),
        }
    }

    /// Position in `[small, large]` arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            PencilVariant::Small => 0,
            PencilVariant::Large => 1,
        }
    }
}

impl fmt::Display for PencilVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PencilVariant::Small => f.write_str("small"),
            PencilVariant::Large => f.write_str("large"),
        }
    }
}

/// Group grid and group shape of one derivative kernel instance.
///
/// Dimensions follow the CUDA convention: `grid_dim` counts groups,
/// `block_dim` counts units per group. For the x axis the stencil runs along
/// `block_dim.0`; for y and z it runs along `block_dim.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGeometry {
    domain: Domain,
    axis: Axis,
    variant: PencilVariant,
    grid_dim: (u32, u32, u32),
    block_dim: (u32, u32, u32),
}

impl LaunchGeometry {
    /// Derive the geometry for `axis` with `pencil_width` pencils per group.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending extent when:
    /// - any of `mx`, `my`, `mz` is not a multiple of [`SMALL_PENCILS`] or is
    ///   shorter than twice the stencil radius
    /// - a large x or y geometry is requested and `mx` or `my` is not a
    ///   multiple of [`LARGE_PENCILS`]
    /// - a large z geometry is requested and `mx` is not a multiple of
    ///   [`LARGE_PENCILS`]
    ///
    /// `mz` never needs more than divisibility by [`SMALL_PENCILS`].
    pub fn derive(domain: Domain, pencil_width: u32, axis: Axis) -> Result<Self, ConfigError> {
        let variant = PencilVariant::from_width(pencil_width)?;

        for dimension in Dimension::ALL {
            check_multiple(domain, dimension, SMALL_PENCILS as usize, SMALL_PENCILS)?;
            check_min_len(domain, dimension, 2 * STENCIL_RADIUS, SMALL_PENCILS)?;
        }

        if variant == PencilVariant::Large {
            for dimension in large_dimensions(axis) {
                check_multiple(domain, *dimension, LARGE_PENCILS as usize, LARGE_PENCILS)?;
            }
        }

        let n = domain.axis_len(axis);
        let width = pencil_width as usize;

        // The large variant keeps roughly the small variant's unit count per
        // group. Along x the packed dimension shrinks its stride; along y and
        // z the stencil dimension gives up units instead. Ownership is strided
        // so a floored count still covers the axis, and at least
        // `STENCIL_RADIUS` units remain to write the halo. `n >= 8` keeps the
        // count within the axis.
        let stencil_units = match (axis, variant) {
            (Axis::X, _) | (_, PencilVariant::Small) => n,
            (_, PencilVariant::Large) => {
                (n * SMALL_PENCILS as usize / LARGE_PENCILS as usize).max(STENCIL_RADIUS)
            }
        };

        let (block_dim, grid_dim) = match axis {
            Axis::X => (
                (n, SMALL_PENCILS as usize),
                (domain.my / width, domain.mz),
            ),
            Axis::Y => ((width, stencil_units), (domain.mx / width, domain.mz)),
            Axis::Z => ((width, stencil_units), (domain.mx / width, domain.my)),
        };

        let geometry = Self {
            domain,
            axis,
            variant,
            grid_dim: (grid_dim.0 as u32, grid_dim.1 as u32, 1),
            block_dim: (block_dim.0 as u32, block_dim.1 as u32, 1),
        };

        debug!(
            "{}: grid {:?}, block {:?}, tile {}x{}",
            geometry.kernel_name(),
            geometry.grid_dim,
            geometry.block_dim,
            n,
            width
        );

        Ok(geometry)
    }

    /// Derive the geometry for a named variant.
    pub fn for_variant(
        domain: Domain,
        variant: PencilVariant,
        axis: Axis,
    ) -> Result<Self, ConfigError> {
        Self::derive(domain, variant.pencil_width(), axis)
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn variant(&self) -> PencilVariant {
        self.variant
    }

    /// Groups along each grid dimension.
    pub fn grid_dim(&self) -> (u32, u32, u32) {
        self.grid_dim
    }

    /// Units along each group dimension.
    pub fn block_dim(&self) -> (u32, u32, u32) {
        self.block_dim
    }

    /// Points along the stencil axis.
    pub fn axis_len(&self) -> usize {
        self.domain.axis_len(self.axis)
    }

    /// Pencils per group.
    pub fn pencils(&self) -> usize {
        self.variant.pencil_width() as usize
    }

    /// Units per group.
    pub fn units_per_group(&self) -> usize {
        let (x, y, z) = self.block_dim;
        x as usize * y as usize * z as usize
    }

    /// Total number of groups.
    pub fn group_count(&self) -> usize {
        let (x, y, z) = self.grid_dim;
        x as usize * y as usize * z as usize
    }

    /// Tile core dimensions `(axis_len, pencils)`, without the halo.
    pub fn tile_dims(&self) -> (usize, usize) {
        (self.axis_len(), self.pencils())
    }

    /// Tile size in bytes, halo included.
    pub fn tile_bytes(&self) -> usize {
        (self.axis_len() + 2 * STENCIL_RADIUS) * self.pencils() * std::mem::size_of::<f32>()
    }

    /// Extents covered by all groups, as `(x, y, z)`.
    ///
    /// Equals the domain for every valid geometry.
    pub fn covered_extent(&self) -> (usize, usize, usize) {
        let n = self.axis_len();
        let packed = self.grid_dim.0 as usize * self.pencils();
        let outer = self.grid_dim.1 as usize;
        match self.axis {
            Axis::X => (n, packed, outer),
            Axis::Y => (packed, n, outer),
            Axis::Z => (packed, outer, n),
        }
    }

    /// Kernel entry-point name, e.g. `derivative_y_lPencils`.
    pub fn kernel_name(&self) -> String {
        match self.variant {
            PencilVariant::Small => format!("derivative_{}", self.axis),
            PencilVariant::Large => format!("derivative_{}_lPencils", self.axis),
        }
    }

    /// Check the geometry against a target's per-group limits.
    pub fn check_limits(&self, limits: &DeviceLimits) -> Result<(), ConfigError> {
        let units = self.units_per_group();
        if units > limits.max_units_per_group {
            return Err(ConfigError::ExceedsDeviceLimit {
                kernel: self.kernel_name(),
                resource: "units per group",
                required: units,
                limit: limits.max_units_per_group,
            });
        }

        let bytes = self.tile_bytes();
        if bytes > limits.max_tile_bytes {
            return Err(ConfigError::ExceedsDeviceLimit {
                kernel: self.kernel_name(),
                resource: "tile bytes",
                required: bytes,
                limit: limits.max_tile_bytes,
            });
        }

        Ok(())
    }
}

/// Extents that must be multiples of [`LARGE_PENCILS`] for a large geometry.
fn large_dimensions(axis: Axis) -> &'static [Dimension] {
    match axis {
        Axis::X | Axis::Y => &[Dimension::Mx, Dimension::My],
        Axis::Z => &[Dimension::Mx],
    }
}

fn check_multiple(
    domain: Domain,
    dimension: Dimension,
    multiple: usize,
    pencil_width: u32,
) -> Result<(), ConfigError> {
    let size = domain.extent(dimension);
    if size % multiple != 0 {
        return Err(ConfigError::NotMultiple {
            dimension,
            size,
            multiple,
            pencil_width,
        });
    }
    Ok(())
}

fn check_min_len(
    domain: Domain,
    dimension: Dimension,
    minimum: usize,
    pencil_width: u32,
) -> Result<(), ConfigError> {
    let size = domain.extent(dimension);
    if size < minimum {
        return Err(ConfigError::TooShort {
            dimension,
            size,
            minimum,
            pencil_width,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> Domain {
        Domain::cubic(64)
    }

    #[test]
    fn test_small_shapes() {
        let x = LaunchGeometry::derive(cube(), 4, Axis::X).unwrap();
        assert_eq!(x.block_dim(), (64, 4, 1));
        assert_eq!(x.grid_dim(), (16, 64, 1));

        let y = LaunchGeometry::derive(cube(), 4, Axis::Y).unwrap();
        assert_eq!(y.block_dim(), (4, 64, 1));
        assert_eq!(y.grid_dim(), (16, 64, 1));

        let z = LaunchGeometry::derive(cube(), 4, Axis::Z).unwrap();
        assert_eq!(z.block_dim(), (4, 64, 1));
        assert_eq!(z.grid_dim(), (16, 64, 1));
    }

    #[test]
    fn test_large_shapes() {
        let x = LaunchGeometry::derive(cube(), 32, Axis::X).unwrap();
        assert_eq!(x.block_dim(), (64, 4, 1));
        assert_eq!(x.grid_dim(), (2, 64, 1));

        let z = LaunchGeometry::derive(cube(), 32, Axis::Z).unwrap();
        assert_eq!(z.block_dim(), (32, 8, 1));
        assert_eq!(z.grid_dim(), (2, 64, 1));
    }

    #[test]
    fn test_variants_share_unit_count() {
        for axis in Axis::ALL {
            let small = LaunchGeometry::for_variant(cube(), PencilVariant::Small, axis).unwrap();
            let large = LaunchGeometry::for_variant(cube(), PencilVariant::Large, axis).unwrap();
            assert_eq!(small.units_per_group(), large.units_per_group(), "axis {axis}");
        }
    }

    #[test]
    fn test_rejects_non_multiple_of_small() {
        let err = LaunchGeometry::derive(Domain::new(64, 64, 62), 4, Axis::X).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotMultiple {
                dimension: Dimension::Mz,
                size: 62,
                multiple: 4,
                pencil_width: 4,
            }
        );
    }

    #[test]
    fn test_rejects_unsupported_width() {
        let err = LaunchGeometry::derive(cube(), 16, Axis::X).unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedPencilWidth(16));
    }

    #[test]
    fn test_large_x_needs_my_multiple() {
        let domain = Domain::new(64, 48, 64);
        assert!(LaunchGeometry::derive(domain, 4, Axis::X).is_ok());

        let err = LaunchGeometry::derive(domain, 32, Axis::X).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotMultiple {
                dimension: Dimension::My,
                pencil_width: 32,
                ..
            }
        ));
    }

    #[test]
    fn test_large_x_needs_mx_multiple() {
        let domain = Domain::new(48, 64, 64);
        assert!(LaunchGeometry::derive(domain, 4, Axis::X).is_ok());

        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let err = LaunchGeometry::derive(domain, 32, axis).unwrap_err();
            assert_eq!(
                err,
                ConfigError::NotMultiple {
                    dimension: Dimension::Mx,
                    size: 48,
                    multiple: 32,
                    pencil_width: 32,
                },
                "axis {axis}"
            );
        }
    }

    #[test]
    fn test_large_y_needs_my_multiple() {
        let err = LaunchGeometry::derive(Domain::new(64, 48, 64), 32, Axis::Y).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotMultiple {
                dimension: Dimension::My,
                size: 48,
                ..
            }
        ));

        // Large z only bundles along x.
        assert!(LaunchGeometry::derive(Domain::new(64, 48, 64), 32, Axis::Z).is_ok());
    }

    #[test]
    fn test_z_only_needs_small_multiple() {
        for mz in [12, 20, 36, 44] {
            let domain = Domain::new(64, 64, mz);
            for axis in Axis::ALL {
                for width in [4, 32] {
                    let geometry = LaunchGeometry::derive(domain, width, axis).unwrap();
                    assert_eq!(geometry.covered_extent(), (64, 64, mz), "axis {axis}");
                }
            }
        }
    }

    #[test]
    fn test_large_z_floors_stencil_units() {
        let z = LaunchGeometry::derive(Domain::new(64, 64, 36), 32, Axis::Z).unwrap();
        assert_eq!(z.block_dim(), (32, 4, 1));

        // Never fewer units than the halo needs.
        let z = LaunchGeometry::derive(Domain::new(64, 64, 12), 32, Axis::Z).unwrap();
        assert_eq!(z.block_dim(), (32, 4, 1));

        let z = LaunchGeometry::derive(Domain::new(64, 64, 128), 32, Axis::Z).unwrap();
        assert_eq!(z.block_dim(), (32, 16, 1));
    }

    #[test]
    fn test_rejects_short_axis() {
        let err = LaunchGeometry::derive(Domain::new(4, 64, 64), 4, Axis::Y).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TooShort {
                dimension: Dimension::Mx,
                ..
            }
        ));
    }

    #[test]
    fn test_covered_extent_matches_domain() {
        let domain = Domain::new(64, 32, 40);
        for axis in Axis::ALL {
            let geometry = LaunchGeometry::derive(domain, 4, axis).unwrap();
            assert_eq!(geometry.covered_extent(), (64, 32, 40), "axis {axis}");
        }
    }

    #[test]
    fn test_kernel_names() {
        let x = LaunchGeometry::derive(cube(), 4, Axis::X).unwrap();
        let y = LaunchGeometry::derive(cube(), 32, Axis::Y).unwrap();
        assert_eq!(x.kernel_name(), "derivative_x");
        assert_eq!(y.kernel_name(), "derivative_y_lPencils");
    }

    #[test]
    fn test_tile_bytes() {
        let geometry = LaunchGeometry::derive(cube(), 32, Axis::X).unwrap();
        assert_eq!(geometry.tile_dims(), (64, 32));
        assert_eq!(geometry.tile_bytes(), 72 * 32 * 4);
    }

    #[test]
    fn test_device_limits() {
        let geometry = LaunchGeometry::derive(Domain::new(512, 64, 64), 4, Axis::X).unwrap();
        assert_eq!(geometry.units_per_group(), 2048);

        let err = geometry.check_limits(&DeviceLimits::cuda_default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ExceedsDeviceLimit {
                resource: "units per group",
                required: 2048,
                limit: 1024,
                ..
            }
        ));
        assert!(geometry.check_limits(&DeviceLimits::unbounded()).is_ok());

        let tight = DeviceLimits::unbounded().with_max_tile_bytes(1024);
        assert!(geometry.check_limits(&tight).is_err());
    }
}
